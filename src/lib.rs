mod device;
mod error;
mod property;
mod retry;
mod state;
mod transport;

pub use device::*;
pub use error::*;
pub use property::*;
pub use retry::*;
pub use state::*;
pub use transport::*;
