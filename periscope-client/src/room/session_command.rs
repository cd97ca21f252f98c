use crate::error::SessionError;
use crate::room::SessionSnapshot;
use periscope_core::Identity;
use tokio::sync::oneshot;

pub type Reply<T = ()> = oneshot::Sender<Result<T, SessionError>>;

/// Requests accepted by the session task.
#[derive(Debug)]
pub enum SessionCommand {
    Connect { reply: Reply },

    Join { reply: Reply },

    Leave { reply: Reply },

    /// Leaves first when joined.
    Disconnect { reply: Reply },

    /// Send an offer to `peer` and negotiate a receive-only connection.
    Watch { peer: Identity, reply: Reply },

    /// Replies whether the peer was registered.
    RemovePeer { peer: Identity, reply: Reply<bool> },

    Snapshot { reply: oneshot::Sender<SessionSnapshot> },

    /// Disconnect and stop the task.
    Shutdown { reply: oneshot::Sender<()> },
}
