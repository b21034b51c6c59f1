//! Byte-range arithmetic for append-only log streams.
//!
//! Offsets are `i32` to match PostgreSQL `int4range`. Ranges are half-open
//! `[start, end)`.

use serde::Serialize;

use crate::error::CoreError;

/// A half-open byte range `[start, end)` within a log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogRange {
    pub start: i32,
    pub end: i32,
}

impl LogRange {
    pub fn new(start: i32, end: i32) -> Self {
        debug_assert!(start <= end, "range start must not exceed end");
        Self { start, end }
    }

    /// The empty range positioned at `offset`.
    pub fn empty_at(offset: i32) -> Self {
        Self::new(offset, offset)
    }
}

/// The set of chunks a read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRange {
    /// The whole stream.
    Full,
    /// Chunks intersecting `[start, end)`; `end = None` is unbounded.
    Window { start: i32, end: Option<i32> },
}

/// Validate client-supplied `start`/`end` offsets before reading.
pub fn validate_read_bounds(start: Option<i32>, end: Option<i32>) -> Result<(), CoreError> {
    if start.is_some_and(|s| s < 0) || end.is_some_and(|e| e < 0) {
        return Err(CoreError::Validation(
            "Log range offsets must be non-negative".into(),
        ));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(CoreError::Validation(format!(
                "Invalid log range: end ({end}) is before start ({start})"
            )));
        }
    }
    Ok(())
}

/// Turn the optional `start`/`end` offsets into a [`ReadRange`] for a
/// stream whose current size is `size`.
///
/// - neither given: the whole stream;
/// - `start` given: `[start, end)`, unbounded when `end` is absent;
/// - only `end` given: the last `end` bytes, `[max(size - end, 0), size)`.
///
/// Inputs are expected to have passed [`validate_read_bounds`]; anything
/// else is clamped into a well-formed window.
pub fn resolve_read_range(start: Option<i32>, end: Option<i32>, size: i32) -> ReadRange {
    match (start, end) {
        (None, None) => ReadRange::Full,
        (Some(start), end) => {
            let start = start.max(0);
            ReadRange::Window {
                start,
                end: end.map(|e| e.max(start)),
            }
        }
        (None, Some(last)) => ReadRange::Window {
            start: size.saturating_sub(last.max(0)).max(0),
            end: Some(size),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn no_bounds_is_full() {
        assert_eq!(resolve_read_range(None, None, 100), ReadRange::Full);
    }

    #[test]
    fn start_only_is_unbounded() {
        assert_eq!(
            resolve_read_range(Some(10), None, 100),
            ReadRange::Window { start: 10, end: None }
        );
    }

    #[test]
    fn start_and_end_is_window() {
        assert_eq!(
            resolve_read_range(Some(0), Some(5), 100),
            ReadRange::Window { start: 0, end: Some(5) }
        );
    }

    #[test]
    fn end_only_is_tail() {
        assert_eq!(
            resolve_read_range(None, Some(30), 100),
            ReadRange::Window { start: 70, end: Some(100) }
        );
    }

    #[test]
    fn tail_larger_than_stream_is_clipped_at_zero() {
        assert_eq!(
            resolve_read_range(None, Some(500), 100),
            ReadRange::Window { start: 0, end: Some(100) }
        );
    }

    #[test]
    fn negative_offsets_are_rejected() {
        assert_matches!(
            validate_read_bounds(Some(-1), None),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_read_bounds(None, Some(-5)),
            Err(CoreError::Validation(_))
        );
        assert!(validate_read_bounds(Some(0), Some(0)).is_ok());
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert_matches!(
            validate_read_bounds(Some(10), Some(5)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn tail_of_empty_stream_is_empty_window() {
        assert_eq!(
            resolve_read_range(None, Some(10), 0),
            ReadRange::Window { start: 0, end: Some(0) }
        );
    }
}
