//! Payload types.

use bytes::Bytes;
use conductor_core::attachment::validate_workspace_file_name;
use conductor_core::entry_point::EntryPoint;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::PipelineError;

/// Multipart field carrying the workspace archive.
pub const ARCHIVE_FIELD: &str = "archive";

/// Multipart field carrying JSON request data.
pub const REQUEST_FIELD: &str = "request";

/// A client-supplied file to place in the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFile {
    pub name: String,
    pub data: Bytes,
}

/// The request shapes a process can be started from.
#[derive(Debug, Clone)]
pub enum PayloadSource {
    /// A ready-made workspace archive; nothing is added to it.
    RawArchive { archive: Bytes },

    /// `project[:path]` plus an optional archive, JSON request data and
    /// extra workspace files (a multipart form).
    MultipartProject {
        entry_point: String,
        archive: Option<Bytes>,
        request: Map<String, Value>,
        files: Vec<WorkspaceFile>,
    },

    /// `project[:path]` plus request data only.
    ParametersOnly {
        entry_point: String,
        request: Map<String, Value>,
    },
}

impl PayloadSource {
    /// Build a [`PayloadSource::MultipartProject`] from raw form fields.
    ///
    /// `archive` becomes the workspace archive, `request` is parsed as a JSON
    /// object and merged into the request data (later fields win), anything
    /// else becomes a workspace file named after the field.
    pub fn from_form_fields(
        entry_point: impl Into<String>,
        fields: impl IntoIterator<Item = (String, Bytes)>,
    ) -> Result<Self, PipelineError> {
        let mut archive = None;
        let mut request = Map::new();
        let mut files = Vec::new();

        for (name, data) in fields {
            match name.as_str() {
                ARCHIVE_FIELD => archive = Some(data),
                REQUEST_FIELD => {
                    if data.is_empty() {
                        continue;
                    }
                    match serde_json::from_slice::<Value>(&data)? {
                        Value::Object(map) => request.extend(map),
                        _ => return Err(PipelineError::RequestNotObject),
                    }
                }
                _ => {
                    validate_workspace_file_name(&name)?;
                    files.push(WorkspaceFile { name, data });
                }
            }
        }

        Ok(Self::MultipartProject {
            entry_point: entry_point.into(),
            archive,
            request,
            files,
        })
    }

    /// The raw entry point string, if the source carries one.
    pub fn entry_point(&self) -> Option<&str> {
        match self {
            Self::RawArchive { .. } => None,
            Self::MultipartProject { entry_point, .. } | Self::ParametersOnly { entry_point, .. } => {
                Some(entry_point)
            }
        }
    }
}

/// Routing information derived from the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadHeaders {
    pub project_name: Option<String>,
    pub entry_point: Option<EntryPoint>,
}

/// Everything needed to dispatch one process.
#[derive(Debug, Clone)]
pub struct Payload {
    pub instance_id: Uuid,
    pub headers: PayloadHeaders,
    pub request_data: Map<String, Value>,
    pub workspace_archive: Option<Bytes>,
    pub workspace_files: Vec<WorkspaceFile>,
}

impl Payload {
    pub fn project_name(&self) -> Option<&str> {
        self.headers.project_name.as_deref()
    }

    /// The concrete entry point sent to the agent.
    pub fn entry_point(&self) -> Option<&str> {
        self.headers.entry_point.as_ref().and_then(EntryPoint::concrete)
    }
}
