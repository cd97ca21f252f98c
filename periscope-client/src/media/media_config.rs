use periscope_core::IceServerConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the WebRTC media engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::default()],
        }
    }
}
