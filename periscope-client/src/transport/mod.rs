mod transport_adapter;
mod ws_transport;

pub use transport_adapter::*;
pub use ws_transport::*;
