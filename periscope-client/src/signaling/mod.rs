mod negotiation_engine;
mod router;

pub use negotiation_engine::*;
pub use router::*;
