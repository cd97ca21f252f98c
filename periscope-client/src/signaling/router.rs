use periscope_core::{IceMessage, Identity, SdpMessage, SignalMessage};
use tracing::debug;

/// Work the negotiation engine has to do for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutedAction {
    RemoteOffer(SdpMessage),
    RemoteAnswer(SdpMessage),
    RemoteIceCandidate(IceMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Sent by this session and echoed back by the channel.
    SelfOriginated,
    /// Carries a recipient other than this session.
    AddressedElsewhere,
    /// Join/leave announcements from other sessions. Nothing consumes them yet.
    Membership,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Action(RoutedAction),
    Ignored(IgnoreReason),
}

/// The single boundary check between decoded traffic and the negotiation engine.
#[derive(Debug, Clone)]
pub struct Router {
    local: Identity,
}

impl Router {
    pub fn new(local: Identity) -> Self {
        Self { local }
    }

    pub fn local(&self) -> &Identity {
        &self.local
    }

    pub fn route(&self, msg: SignalMessage) -> Route {
        if msg.sender() == &self.local {
            debug!("Ignoring self-originated {}", msg.kind());
            return Route::Ignored(IgnoreReason::SelfOriginated);
        }
        if let Some(to) = msg.recipient() {
            if to != &self.local {
                debug!("Ignoring {} from {} addressed to {}", msg.kind(), msg.sender(), to);
                return Route::Ignored(IgnoreReason::AddressedElsewhere);
            }
        }

        match msg {
            SignalMessage::Offer(offer) => Route::Action(RoutedAction::RemoteOffer(offer)),
            SignalMessage::Answer(answer) => Route::Action(RoutedAction::RemoteAnswer(answer)),
            SignalMessage::IceCandidate(ice) => Route::Action(RoutedAction::RemoteIceCandidate(ice)),
            SignalMessage::JoinRequest(m) | SignalMessage::LeaveRequest(m) => {
                debug!("Membership announcement from {} ({})", m.from, m.video_source);
                Route::Ignored(IgnoreReason::Membership)
            }
        }
    }
}
