//! Name validation for attachment downloads and workspace files.

use crate::error::CoreError;

/// Validate a requested attachment entry name.
///
/// Directory entries (names ending in `/`) cannot be downloaded.
pub fn validate_attachment_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() || name.ends_with('/') {
        return Err(CoreError::Validation(format!(
            "Invalid attachment name: {name}"
        )));
    }
    Ok(())
}

/// Validate a relative file name supplied by a client for the workspace.
///
/// Rejects empty names, absolute paths, backslashes and `..` components so
/// a name can never escape the workspace root.
pub fn validate_workspace_file_name(name: &str) -> Result<(), CoreError> {
    let invalid = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.ends_with('/')
        || name.split('/').any(|c| c.is_empty() || c == "." || c == "..");

    if invalid {
        return Err(CoreError::Validation(format!(
            "Invalid workspace file name: {name}"
        )));
    }
    Ok(())
}
