//! Dispatch archive construction.

use std::collections::HashSet;
use std::io::{self, Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::payload::Payload;
use crate::{PipelineError, REQUEST_DATA_FILE_NAME};

impl Payload {
    /// Build the zip uploaded to the agent.
    ///
    /// Contains the entries of the workspace archive, then the workspace
    /// files, then [`REQUEST_DATA_FILE_NAME`] with the request data when
    /// there is any. Later entries replace earlier ones with the same name.
    /// A workspace archive with nothing to add is returned unchanged.
    pub fn build_archive(&self) -> Result<Bytes, PipelineError> {
        if self.workspace_files.is_empty() && self.request_data.is_empty() {
            if let Some(archive) = &self.workspace_archive {
                return Ok(archive.clone());
            }
        }

        let mut overridden: HashSet<&str> =
            self.workspace_files.iter().map(|f| f.name.as_str()).collect();
        if !self.request_data.is_empty() {
            overridden.insert(REQUEST_DATA_FILE_NAME);
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        if let Some(archive) = &self.workspace_archive {
            let mut source = ZipArchive::new(Cursor::new(archive.as_ref()))
                .map_err(|e| PipelineError::InvalidArchive(e.to_string()))?;
            for i in 0..source.len() {
                let mut entry = source.by_index(i)?;
                let name = entry.name().to_string();
                if overridden.contains(name.as_str()) {
                    continue;
                }
                if entry.is_dir() {
                    writer.add_directory(name, options)?;
                } else {
                    writer.start_file(name, options)?;
                    io::copy(&mut entry, &mut writer)?;
                }
            }
        }

        for file in &self.workspace_files {
            writer.start_file(file.name.as_str(), options)?;
            writer.write_all(&file.data)?;
        }

        if !self.request_data.is_empty() {
            writer.start_file(REQUEST_DATA_FILE_NAME, options)?;
            serde_json::to_writer(&mut writer, &self.request_data)
                .map_err(|e| PipelineError::Io(e.into()))?;
        }

        let cursor = writer.finish()?;
        Ok(Bytes::from(cursor.into_inner()))
    }
}
