//! Repository for the append-only process log store.
//!
//! Two kinds of streams live here:
//!
//! - the process log (`process_logs`), one stream per process;
//! - segment logs (`process_log_data`), one stream per named segment, all
//!   of them also laid out back to back in a process-wide `log_range`.
//!
//! Every append runs in its own transaction holding a per-process advisory
//! lock, so the next range is computed from the committed tail and ranges
//! never overlap, even across server instances. A failed append rolls back
//! and leaves no gap.

use conductor_core::log_range::{resolve_read_range, LogRange, ReadRange};
use conductor_core::process::ProcessKey;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::process_log::{LogChunk, LogSegment, ProcessLog};
use crate::models::status::SegmentStatus;

/// Column list for `process_log_segments` queries.
const SEGMENT_COLUMNS: &str = "segment_id, correlation_id, segment_name, segment_ts, status_id";

/// Maximum page size for segment listing.
const MAX_SEGMENT_LIMIT: i64 = 1000;

/// Default page size for segment listing.
const DEFAULT_SEGMENT_LIMIT: i64 = 30;

pub struct ProcessLogRepo;

impl ProcessLogRepo {
    // -----------------------------------------------------------------------
    // Process log
    // -----------------------------------------------------------------------

    /// Append `data` to the process log and return the range it occupies.
    ///
    /// Empty data stores nothing and yields the empty range at the tail.
    pub async fn append(
        pool: &PgPool,
        key: &ProcessKey,
        data: &[u8],
    ) -> Result<LogRange, sqlx::Error> {
        let len = chunk_len(data)?;
        let mut tx = pool.begin().await?;
        lock_process(&mut tx, key).await?;

        let range = if len == 0 {
            LogRange::empty_at(process_log_size(&mut tx, key).await?)
        } else {
            let (start, end) = sqlx::query_as::<_, (i32, i32)>(
                "INSERT INTO process_logs (instance_id, instance_created_at, chunk_range, chunk_data) \
                 SELECT $1, $2, int4range(t.tail, t.tail + $3), $4 \
                 FROM ( \
                     SELECT COALESCE(MAX(upper(chunk_range)), 0) AS tail \
                     FROM process_logs \
                     WHERE instance_id = $1 AND instance_created_at = $2 \
                 ) t \
                 RETURNING lower(chunk_range), upper(chunk_range)",
            )
            .bind(key.instance_id)
            .bind(key.created_at)
            .bind(len)
            .bind(data)
            .fetch_one(&mut *tx)
            .await?;
            LogRange::new(start, end)
        };

        tx.commit().await?;
        Ok(range)
    }

    /// Read the process log. See [`resolve_read_range`] for the meaning of
    /// `start` and `end`.
    pub async fn read(
        pool: &PgPool,
        key: &ProcessKey,
        start: Option<i32>,
        end: Option<i32>,
    ) -> Result<ProcessLog, sqlx::Error> {
        let mut tx = pool.begin().await?;
        set_repeatable_read(&mut tx).await?;

        let size = process_log_size(&mut tx, key).await?;
        let (lower, upper) = window_bounds(resolve_read_range(start, end, size));
        let chunks = sqlx::query_as::<_, LogChunk>(
            "SELECT lower(chunk_range) AS start, chunk_data AS data \
             FROM process_logs \
             WHERE instance_id = $1 AND instance_created_at = $2 \
               AND ($3::int4 IS NULL OR chunk_range && int4range($3, $4)) \
             ORDER BY chunk_range",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(lower)
        .bind(upper)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ProcessLog { size, chunks })
    }

    // -----------------------------------------------------------------------
    // Segments
    // -----------------------------------------------------------------------

    /// Return the ID of the segment identified by `(correlation_id, name)`,
    /// creating it with the default status if it does not exist yet.
    /// Concurrent callers with the same identity get the same ID.
    pub async fn get_or_create_segment(
        pool: &PgPool,
        key: &ProcessKey,
        correlation_id: Uuid,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO process_log_segments \
                 (instance_id, instance_created_at, correlation_id, segment_name) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_process_log_segments_correlation DO NOTHING \
             RETURNING segment_id",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(correlation_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        match inserted {
            Some(id) => Ok(id),
            None => Self::find_segment_id(pool, key, correlation_id, name)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    pub async fn find_segment_id(
        pool: &PgPool,
        key: &ProcessKey,
        correlation_id: Uuid,
        name: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT segment_id FROM process_log_segments \
             WHERE instance_id = $1 AND instance_created_at = $2 \
               AND correlation_id = $3 AND segment_name = $4",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(correlation_id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Segments of a process, oldest first.
    pub async fn list_segments(
        pool: &PgPool,
        key: &ProcessKey,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<LogSegment>, sqlx::Error> {
        let limit = limit
            .unwrap_or(DEFAULT_SEGMENT_LIMIT)
            .clamp(1, MAX_SEGMENT_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {SEGMENT_COLUMNS} FROM process_log_segments \
             WHERE instance_id = $1 AND instance_created_at = $2 \
             ORDER BY segment_ts ASC, segment_id ASC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, LogSegment>(&query)
            .bind(key.instance_id)
            .bind(key.created_at)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Returns `false` if the segment does not belong to the process.
    pub async fn update_segment_status(
        pool: &PgPool,
        key: &ProcessKey,
        segment_id: i64,
        status: SegmentStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE process_log_segments SET status_id = $4 \
             WHERE instance_id = $1 AND instance_created_at = $2 AND segment_id = $3",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(segment_id)
        .bind(status.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Append `data` to a segment and return its segment-local range.
    ///
    /// The chunk also receives the next range of the process-wide segment
    /// data stream. Fails with [`sqlx::Error::RowNotFound`] when the segment
    /// does not belong to the process.
    pub async fn append_segment(
        pool: &PgPool,
        key: &ProcessKey,
        segment_id: i64,
        data: &[u8],
    ) -> Result<LogRange, sqlx::Error> {
        let len = chunk_len(data)?;
        let mut tx = pool.begin().await?;
        lock_process(&mut tx, key).await?;

        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                 SELECT 1 FROM process_log_segments \
                 WHERE instance_id = $1 AND instance_created_at = $2 AND segment_id = $3 \
             )",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(segment_id)
        .fetch_one(&mut *tx)
        .await?;
        if !owned {
            return Err(sqlx::Error::RowNotFound);
        }

        let range = if len == 0 {
            LogRange::empty_at(segment_size(&mut tx, key, segment_id).await?)
        } else {
            let (start, end) = sqlx::query_as::<_, (i32, i32)>(
                "INSERT INTO process_log_data \
                     (instance_id, instance_created_at, segment_id, segment_range, log_range, chunk_data) \
                 SELECT $1, $2, $3, int4range(s.tail, s.tail + $4), int4range(l.tail, l.tail + $4), $5 \
                 FROM ( \
                     SELECT COALESCE(MAX(upper(segment_range)), 0) AS tail \
                     FROM process_log_data \
                     WHERE instance_id = $1 AND instance_created_at = $2 AND segment_id = $3 \
                 ) s, ( \
                     SELECT COALESCE(MAX(upper(log_range)), 0) AS tail \
                     FROM process_log_data \
                     WHERE instance_id = $1 AND instance_created_at = $2 \
                 ) l \
                 RETURNING lower(segment_range), upper(segment_range)",
            )
            .bind(key.instance_id)
            .bind(key.created_at)
            .bind(segment_id)
            .bind(len)
            .bind(data)
            .fetch_one(&mut *tx)
            .await?;
            LogRange::new(start, end)
        };

        tx.commit().await?;
        Ok(range)
    }

    /// Read one segment's stream, with the same range semantics as
    /// [`read`](Self::read).
    pub async fn read_segment(
        pool: &PgPool,
        key: &ProcessKey,
        segment_id: i64,
        start: Option<i32>,
        end: Option<i32>,
    ) -> Result<ProcessLog, sqlx::Error> {
        let mut tx = pool.begin().await?;
        set_repeatable_read(&mut tx).await?;

        let size = segment_size(&mut tx, key, segment_id).await?;
        let (lower, upper) = window_bounds(resolve_read_range(start, end, size));
        let chunks = sqlx::query_as::<_, LogChunk>(
            "SELECT lower(segment_range) AS start, chunk_data AS data \
             FROM process_log_data \
             WHERE instance_id = $1 AND instance_created_at = $2 AND segment_id = $3 \
               AND ($4::int4 IS NULL OR segment_range && int4range($4, $5)) \
             ORDER BY segment_range",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(segment_id)
        .bind(lower)
        .bind(upper)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ProcessLog { size, chunks })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn chunk_len(data: &[u8]) -> Result<i32, sqlx::Error> {
    i32::try_from(data.len()).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// `(lower, upper)` bind values for the `&& int4range($n, $n+1)` filter.
/// `lower = None` disables the filter.
fn window_bounds(range: ReadRange) -> (Option<i32>, Option<i32>) {
    match range {
        ReadRange::Full => (None, None),
        ReadRange::Window { start, end } => (Some(start), end),
    }
}

/// Serialize allocators for one process until the transaction ends.
async fn lock_process(conn: &mut PgConnection, key: &ProcessKey) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(key.instance_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Size and chunk list must come from the same snapshot.
async fn set_repeatable_read(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(conn)
        .await?;
    Ok(())
}

async fn process_log_size(conn: &mut PgConnection, key: &ProcessKey) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(upper(chunk_range)), 0) FROM process_logs \
         WHERE instance_id = $1 AND instance_created_at = $2",
    )
    .bind(key.instance_id)
    .bind(key.created_at)
    .fetch_one(conn)
    .await
}

async fn segment_size(
    conn: &mut PgConnection,
    key: &ProcessKey,
    segment_id: i64,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(upper(segment_range)), 0) FROM process_log_data \
         WHERE instance_id = $1 AND instance_created_at = $2 AND segment_id = $3",
    )
    .bind(key.instance_id)
    .bind(key.created_at)
    .bind(segment_id)
    .fetch_one(conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_read_disables_the_range_filter() {
        assert_eq!(window_bounds(ReadRange::Full), (None, None));
    }

    #[test]
    fn window_binds_both_ends() {
        assert_eq!(
            window_bounds(ReadRange::Window { start: 3, end: Some(9) }),
            (Some(3), Some(9))
        );
        assert_eq!(
            window_bounds(ReadRange::Window { start: 3, end: None }),
            (Some(3), None)
        );
    }

    #[test]
    fn chunk_len_fits_int4() {
        assert_eq!(chunk_len(b"hello").unwrap(), 5);
        assert_eq!(chunk_len(&[]).unwrap(), 0);
    }
}
