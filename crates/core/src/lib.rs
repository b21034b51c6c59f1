//! Domain primitives shared by every Conductor crate.
//!
//! Pure types and functions only: no database, network or filesystem
//! access lives here.

pub mod attachment;
pub mod entry_point;
pub mod error;
pub mod log_range;
pub mod process;
pub mod throttle;
pub mod types;
