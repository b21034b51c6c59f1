//! Payload assembly.
//!
//! Turns one of the accepted request shapes ([`PayloadSource`]) into a
//! canonical [`Payload`], and a payload into the zip archive uploaded to
//! the execution agent.

pub mod archive;
pub mod assembler;
pub mod payload;

pub use assembler::assemble;
pub use payload::{Payload, PayloadHeaders, PayloadSource, WorkspaceFile};

use conductor_core::error::CoreError;

/// Name of the archive entry carrying the request data.
pub const REQUEST_DATA_FILE_NAME: &str = "_main.json";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid workspace archive: {0}")]
    InvalidArchive(String),

    #[error("Request data must be a JSON object")]
    RequestNotObject,

    #[error("Invalid request data: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("Archive write failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Archive I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for CoreError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Invalid(core) => core,
            PipelineError::Archive(_) | PipelineError::Io(_) => {
                CoreError::Internal(err.to_string())
            }
            other => CoreError::Validation(other.to_string()),
        }
    }
}
