use crate::events::Notification;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Consumer of projected notifications.
#[async_trait]
pub trait PresentationSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Delivers notifications over an unbounded channel.
pub struct ChannelPresentation {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelPresentation {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl PresentationSink for ChannelPresentation {
    async fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("Presentation receiver dropped");
        }
    }
}
