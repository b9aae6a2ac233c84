use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("handshake rejected, check the device token")]
    Auth,
    #[error("remote call timed out")]
    Timeout,
    #[error("miio protocol error: {0}")]
    Protocol(String),
    #[error("device returned error code {code}")]
    Rpc { code: i32 },
}

/// The miIO RPC transport the engine drives. Implementations own encryption,
/// token handshake and datagram framing; the engine only sees sessions and
/// JSON-shaped calls.
pub trait MiioTransport: Send + Sync {
    /// Open session to one device endpoint.
    type Session: Send + Sync + 'static;

    fn connect(
        &self,
        address: &str,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Self::Session, TransportError>> + Send;

    fn call(
        &self,
        session: &Self::Session,
        method: &str,
        params: Value,
    ) -> impl std::future::Future<Output = Result<Value, TransportError>> + Send;
}
