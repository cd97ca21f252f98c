mod event_projector;
mod notification;
mod presentation;

pub use event_projector::*;
pub use notification::*;
pub use presentation::*;
