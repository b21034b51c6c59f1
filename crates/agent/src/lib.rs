//! Agent dispatch.
//!
//! [`executor::ProcessExecutor`] drives one process on a remote execution
//! agent: upload the payload, copy the agent's log stream into a
//! [`executor::LogSink`], fetch attachments and reconcile the final status
//! through a [`executor::StatusCallback`]. The agent itself is reached
//! through the [`transport`] traits; [`http`] is the reqwest-backed
//! implementation.

pub mod attachments;
pub mod error;
pub mod executor;
pub mod http;
pub mod transport;

pub use attachments::AttachmentStore;
pub use error::AgentError;
pub use executor::{
    final_process_status, ExecutorError, LogSink, ProcessExecutor, SinkError, StatusCallback,
};
pub use http::HttpAgentConnector;
pub use transport::{AgentConnector, AgentJobStatus, AgentSession};
