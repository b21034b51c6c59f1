//! Entry point parsing.
//!
//! Entry points have the form `project[:path...]`. The first segment names
//! the project, the rest form a path whose last element is the concrete
//! entry point handed to the agent. Project existence is checked by the
//! caller (it needs the database).

use serde::Serialize;

use crate::error::CoreError;

/// Separator between the project name and the path segments.
pub const ENTRY_POINT_SEPARATOR: char = ':';

/// A parsed `project[:path...]` entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub project_name: String,
    pub path: Vec<String>,
}

impl EntryPoint {
    /// Parse an entry point string.
    ///
    /// Trailing empty segments are dropped (`"proj:main:"` has the path
    /// `["main"]`). An empty project name is a validation error.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let mut segments: Vec<&str> = raw.split(ENTRY_POINT_SEPARATOR).collect();
        while segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
            segments.pop();
        }

        let project_name = segments.first().map(|s| s.trim()).unwrap_or_default();
        if project_name.is_empty() {
            return Err(CoreError::Validation(format!(
                "Invalid entry point format: {raw}"
            )));
        }

        Ok(Self {
            project_name: project_name.to_string(),
            path: segments[1..].iter().map(|s| s.to_string()).collect(),
        })
    }

    /// The concrete entry point: the last path element, if any.
    pub fn concrete(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}
