pub mod relay;
pub mod transport;

pub use relay::{OutboxRelay, RelayConfig, TickReport};
pub use transport::{Destinations, Transport, TransportError};
