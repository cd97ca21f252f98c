use serde::{Deserialize, Serialize};

/// Reference to a remote media track. The media itself stays inside the media engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    pub stream_id: String,
    pub kind: String,
}

impl TrackRef {
    pub fn video(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stream_id: stream_id.into(),
            kind: "video".to_owned(),
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind == "video"
    }
}
