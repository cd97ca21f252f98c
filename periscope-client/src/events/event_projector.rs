use crate::error::SessionError;
use crate::events::{Notification, PresentationSink};
use crate::peer::RegistryChange;
use std::sync::Arc;
use tracing::error;

/// Maps registry changes and session errors onto notifications, one each.
#[derive(Clone)]
pub struct EventProjector {
    sink: Arc<dyn PresentationSink>,
}

impl EventProjector {
    pub fn new(sink: Arc<dyn PresentationSink>) -> Self {
        Self { sink }
    }

    pub fn project_change(change: RegistryChange) -> Notification {
        match change {
            RegistryChange::StateChanged { peer, state } => {
                Notification::ConnectionStateChanged { peer, state }
            }
            RegistryChange::TrackAdded { peer, track } => {
                Notification::VideoTrackAdded { peer, track }
            }
            RegistryChange::TrackRemoved { peer } => Notification::VideoTrackRemoved { peer },
        }
    }

    pub fn project_error(err: &SessionError) -> Notification {
        Notification::ErrorOccurred {
            kind: err.kind(),
            peer: err.peer().cloned(),
            message: err.to_string(),
        }
    }

    pub async fn emit_change(&self, change: RegistryChange) {
        self.sink.notify(Self::project_change(change)).await;
    }

    pub async fn emit_changes(&self, changes: impl IntoIterator<Item = RegistryChange>) {
        for change in changes {
            self.emit_change(change).await;
        }
    }

    pub async fn emit_error(&self, err: &SessionError) {
        error!("{}", err);
        self.sink.notify(Self::project_error(err)).await;
    }
}
