use thiserror::Error;

use crate::{Property, TransportError};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("not connected to device")]
    NotConnected,
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("malformed device response: {0}")]
    Response(#[from] serde_json::Error),
    #[error("property {0:?} is not tracked by this device")]
    UnsupportedProperty(Property),
}
