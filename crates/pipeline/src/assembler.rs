//! [`PayloadSource`] → [`Payload`].

use std::io::Cursor;

use bytes::Bytes;
use conductor_core::entry_point::EntryPoint;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::payload::{Payload, PayloadHeaders, PayloadSource};
use crate::PipelineError;

/// Request data key carrying the concrete entry point.
pub const ENTRY_POINT_KEY: &str = "entryPoint";

/// Assemble the canonical payload for a new process.
///
/// Parses the entry point (project existence is the caller's concern),
/// checks that any supplied archive is a readable zip and records the
/// concrete entry point in the request data.
pub fn assemble(instance_id: Uuid, source: PayloadSource) -> Result<Payload, PipelineError> {
    match source {
        PayloadSource::RawArchive { archive } => {
            check_archive(&archive)?;
            Ok(Payload {
                instance_id,
                headers: PayloadHeaders::default(),
                request_data: Map::new(),
                workspace_archive: Some(archive),
                workspace_files: Vec::new(),
            })
        }
        PayloadSource::MultipartProject {
            entry_point,
            archive,
            request,
            files,
        } => {
            if let Some(archive) = &archive {
                check_archive(archive)?;
            }
            let (headers, request_data) = route(&entry_point, request)?;
            Ok(Payload {
                instance_id,
                headers,
                request_data,
                workspace_archive: archive,
                workspace_files: files,
            })
        }
        PayloadSource::ParametersOnly {
            entry_point,
            request,
        } => {
            let (headers, request_data) = route(&entry_point, request)?;
            Ok(Payload {
                instance_id,
                headers,
                request_data,
                workspace_archive: None,
                workspace_files: Vec::new(),
            })
        }
    }
}

fn route(
    raw_entry_point: &str,
    mut request: Map<String, Value>,
) -> Result<(PayloadHeaders, Map<String, Value>), PipelineError> {
    let entry_point = EntryPoint::parse(raw_entry_point)?;
    if let Some(concrete) = entry_point.concrete() {
        request.insert(ENTRY_POINT_KEY.to_string(), Value::String(concrete.to_string()));
    }

    tracing::debug!(
        project = %entry_point.project_name,
        entry_point = ?entry_point.concrete(),
        "Payload routed",
    );

    let headers = PayloadHeaders {
        project_name: Some(entry_point.project_name.clone()),
        entry_point: Some(entry_point),
    };
    Ok((headers, request))
}

fn check_archive(archive: &Bytes) -> Result<(), PipelineError> {
    zip::ZipArchive::new(Cursor::new(archive.as_ref()))
        .map(|_| ())
        .map_err(|e| PipelineError::InvalidArchive(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::zip_of;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn raw_archive_passes_through() {
        let archive = zip_of(&[("main.yml", "flows: {}")]);
        let payload = assemble(Uuid::nil(), PayloadSource::RawArchive { archive: archive.clone() })
            .unwrap();
        assert_eq!(payload.workspace_archive, Some(archive));
        assert_eq!(payload.project_name(), None);
        assert_eq!(payload.entry_point(), None);
        assert!(payload.request_data.is_empty());
    }

    #[test]
    fn garbage_archive_is_rejected() {
        let err = assemble(
            Uuid::nil(),
            PayloadSource::RawArchive {
                archive: Bytes::from_static(b"not a zip"),
            },
        )
        .unwrap_err();
        assert_matches!(err, PipelineError::InvalidArchive(_));
    }

    #[test]
    fn parameters_only_records_entry_point() {
        let payload = assemble(
            Uuid::nil(),
            PayloadSource::ParametersOnly {
                entry_point: "demo:flows:main".into(),
                request: object(json!({ "arguments": { "x": 1 } })),
            },
        )
        .unwrap();
        assert_eq!(payload.project_name(), Some("demo"));
        assert_eq!(payload.entry_point(), Some("main"));
        assert_eq!(payload.request_data["entryPoint"], "main");
        assert_eq!(payload.request_data["arguments"]["x"], 1);
    }

    #[test]
    fn project_only_entry_point_has_no_concrete_name() {
        let payload = assemble(
            Uuid::nil(),
            PayloadSource::ParametersOnly {
                entry_point: "demo".into(),
                request: Map::new(),
            },
        )
        .unwrap();
        assert_eq!(payload.project_name(), Some("demo"));
        assert!(!payload.request_data.contains_key("entryPoint"));
    }

    #[test]
    fn empty_project_is_a_validation_error() {
        let err = assemble(
            Uuid::nil(),
            PayloadSource::ParametersOnly {
                entry_point: ":main".into(),
                request: Map::new(),
            },
        )
        .unwrap_err();
        assert_matches!(err, PipelineError::Invalid(_));
    }
}
