pub mod codec;
pub mod model;

pub use codec::{DecodeError, decode, decode_bytes, encode};
pub use model::*;
