mod media_config;
mod media_engine;
mod peer_event;
mod webrtc_engine;

pub use media_config::*;
pub use media_engine::*;
pub use peer_event::*;
pub use webrtc_engine::*;
