//! Process execution engine.
//!
//! [`ProcessManager`] is the entry point used by the HTTP handlers: it
//! assembles payloads, records process rows and runs each process on its
//! own Tokio task. The [`sinks`] module connects the agent executor to the
//! database.

pub mod manager;
pub mod sinks;

pub use manager::{ProcessManager, WaitError};
