// ── Domain model ──
//
// Canonical shapes the CLI and the forwarder consume. Raw vim25 objects
// from `vmevent-api` are converted into these in `crate::convert`.

pub mod event;
pub mod info;

pub use event::Event;
pub use info::{EnumeratedType, EventCause, EventInfo, EventLongDescription};
