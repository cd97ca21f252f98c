use crate::error::SessionError;
use crate::room::{SessionCommand, SessionSnapshot};
use periscope_core::Identity;
use tokio::sync::{mpsc, oneshot};

/// Cloneable front end of a running session task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    identity: Identity,
}

impl SessionHandle {
    pub fn new(tx: mpsc::Sender<SessionCommand>, identity: Identity) -> Self {
        Self { tx, identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn connect(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Connect { reply }).await?
    }

    pub async fn join(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Join { reply }).await?
    }

    pub async fn leave(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Leave { reply }).await?
    }

    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Disconnect { reply })
            .await?
    }

    /// Offers a receive-only connection to `peer`.
    pub async fn watch(&self, peer: impl Into<Identity>) -> Result<(), SessionError> {
        let peer = peer.into();
        self.request(|reply| SessionCommand::Watch { peer, reply })
            .await?
    }

    /// Returns whether the peer was registered.
    pub async fn remove_peer(&self, peer: impl Into<Identity>) -> Result<bool, SessionError> {
        let peer = peer.into();
        self.request(|reply| SessionCommand::RemovePeer { peer, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Disconnects and stops the task. Succeeds if the task is already gone.
    pub async fn shutdown(&self) {
        let _ = self
            .request(|reply| SessionCommand::Shutdown { reply })
            .await;
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }
}
