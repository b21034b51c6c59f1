//! Request handlers.
//!
//! Handlers delegate to the [`ProcessManager`](crate::engine::ProcessManager)
//! or directly to the repositories in `conductor_db`, and map errors via
//! [`AppError`](crate::error::AppError).

pub mod events;
pub mod logs;
pub mod process;
