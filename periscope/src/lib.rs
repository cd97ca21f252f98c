pub use periscope_core::model::Identity;

pub mod model {
    pub use periscope_core::model::*;
}

pub mod codec {
    pub use periscope_core::codec::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use periscope_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use periscope_relay::*;
}
