//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod process_log_repo;
pub mod process_repo;
pub mod project_repo;
pub mod trigger_repo;

pub use process_log_repo::ProcessLogRepo;
pub use process_repo::ProcessRepo;
pub use project_repo::ProjectRepo;
pub use trigger_repo::TriggerRepo;
