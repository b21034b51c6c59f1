//! On-disk attachment bundles, one zip per process:
//! `<dir>/<instance_id>.zip`.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::AgentError;

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bundle_path(&self, instance_id: Uuid) -> PathBuf {
        self.dir.join(format!("{instance_id}.zip"))
    }

    /// Store the bundle for a process, replacing any previous one.
    ///
    /// Written to a temporary file first so readers never see a partial zip.
    pub async fn save(&self, instance_id: Uuid, bundle: Bytes) -> Result<(), AgentError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.bundle_path(instance_id);
        let tmp = self.dir.join(format!("{instance_id}.zip.tmp"));
        tokio::fs::write(&tmp, &bundle).await?;
        tokio::fs::rename(&tmp, &target).await?;
        tracing::debug!(
            instance_id = %instance_id,
            bytes = bundle.len(),
            "Attachment bundle stored",
        );
        Ok(())
    }

    /// Read one entry from a process's bundle.
    ///
    /// `Ok(None)` when there is no bundle, no such entry, or the entry is a
    /// directory.
    pub async fn read_entry(
        &self,
        instance_id: Uuid,
        name: &str,
    ) -> Result<Option<Bytes>, AgentError> {
        let path = self.bundle_path(instance_id);
        let name = name.to_string();
        tokio::task::spawn_blocking(move || read_zip_entry(&path, &name))
            .await
            .map_err(|e| AgentError::Io(io::Error::other(e)))?
    }
}

fn read_zip_entry(path: &Path, name: &str) -> Result<Option<Bytes>, AgentError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut archive = ZipArchive::new(file).map_err(zip_error)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(zip_error(e)),
    };
    if entry.is_dir() {
        return Ok(None);
    }
    let mut data = Vec::with_capacity(initial_capacity(entry.size()));
    entry.read_to_end(&mut data)?;
    Ok(Some(Bytes::from(data)))
}

/// Upper bound on the buffer reserved up front for an entry. The declared
/// size comes from the agent-supplied header and is not trusted beyond this.
const MAX_PREALLOCATED_ENTRY_BYTES: u64 = 1024 * 1024;

fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATED_ENTRY_BYTES) as usize
}

fn zip_error(e: ZipError) -> AgentError {
    match e {
        ZipError::Io(io) => AgentError::Io(io),
        other => AgentError::Protocol(format!("invalid attachment bundle: {other}")),
    }
}
