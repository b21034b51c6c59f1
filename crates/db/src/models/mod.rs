//! Row models and DTOs.

pub mod process;
pub mod process_log;
pub mod project;
pub mod status;
pub mod trigger;
