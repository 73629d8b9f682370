//! Core types for herald.

mod decision;
mod event;
mod feature;
mod feedback;
mod message;
mod profile;

pub use decision::*;
pub use event::*;
pub use feature::*;
pub use feedback::*;
pub use message::*;
pub use profile::*;
