mod config;
mod error;
mod events;
mod media;
mod peer;
mod room;
mod signaling;
mod transport;

pub use config::*;
pub use error::*;
pub use events::*;
pub use media::*;
pub use peer::*;
pub use room::*;
pub use signaling::*;
pub use transport::*;

pub use periscope_core as core;
