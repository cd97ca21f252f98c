use anyhow::{Context, Result};
use periscope_core::Identity;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_PUBLISH_CHANNEL: &str = "viewer-signals";
pub const DEFAULT_SUBSCRIBE_CHANNEL: &str = "stream-signals";

/// Settings for one viewing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the transport connects, e.g. `ws://127.0.0.1:3000/ws`.
    pub transport_address: String,

    /// Local identity. Generated once per session unless set explicitly.
    pub identity: Identity,

    /// Channel this session publishes on.
    pub publish_channel: String,

    /// Channel this session consumes. May equal `publish_channel` on a socket transport.
    pub subscribe_channel: String,

    pub video_source: String,

    pub connect_timeout: Duration,

    /// Offer->answer and answer->connected deadline. `None` disables it.
    pub negotiation_timeout: Option<Duration>,

    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport_address: "ws://127.0.0.1:3000/ws".to_owned(),
            identity: Identity::generate(),
            publish_channel: DEFAULT_PUBLISH_CHANNEL.to_owned(),
            subscribe_channel: DEFAULT_SUBSCRIBE_CHANNEL.to_owned(),
            video_source: String::new(),
            connect_timeout: Duration::from_secs(10),
            negotiation_timeout: Some(Duration::from_secs(30)),
            command_buffer: 100,
        }
    }
}

impl SessionConfig {
    pub fn new(transport_address: impl Into<String>) -> Self {
        Self {
            transport_address: transport_address.into(),
            ..Default::default()
        }
    }

    pub fn with_identity(mut self, identity: impl Into<Identity>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Publish and subscribe on one shared channel.
    pub fn with_shared_channel(mut self, channel: impl Into<String>) -> Self {
        let channel = channel.into();
        self.publish_channel = channel.clone();
        self.subscribe_channel = channel;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    /// Overlays `PERISCOPE_*` environment variables on the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(address) = env::var("PERISCOPE_ADDRESS") {
            config.transport_address = address;
        }
        if let Ok(identity) = env::var("PERISCOPE_IDENTITY") {
            config.identity = Identity::from(identity);
        }
        if let Ok(channel) = env::var("PERISCOPE_PUBLISH_CHANNEL") {
            config.publish_channel = channel;
        }
        if let Ok(channel) = env::var("PERISCOPE_SUBSCRIBE_CHANNEL") {
            config.subscribe_channel = channel;
        }
        if let Ok(source) = env::var("PERISCOPE_VIDEO_SOURCE") {
            config.video_source = source;
        }
        if let Ok(secs) = env::var("PERISCOPE_NEGOTIATION_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .context("PERISCOPE_NEGOTIATION_TIMEOUT_SECS must be a whole number of seconds")?;
            config.negotiation_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }
}
