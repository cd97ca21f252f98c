mod connection_state;
mod ice_server;
mod identity;
mod relay;
mod signaling;
mod track;

pub use connection_state::ConnectionState;
pub use ice_server::IceServerConfig;
pub use identity::Identity;
pub use relay::RelayFrame;
pub use signaling::{IceCandidate, IceMessage, MembershipMessage, MessageKind, SdpMessage, SignalMessage};
pub use track::TrackRef;
