//! Durable job queue backed by libSQL.
//!
//! Each named queue is an ordered list of opaque payloads. Pushes append to
//! the tail, pops remove the head with a single `DELETE ... RETURNING`, so a
//! payload is handed to exactly one consumer even when several workers or
//! processes share the database file.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::Database;
use crate::error::Result;

/// Default re-poll interval while blocked on an empty queue.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Named FIFO lists of opaque payloads (async)
#[allow(async_fn_in_trait)]
pub trait JobQueue {
    /// Append a payload to the tail of `queue`
    async fn put(&self, queue: &str, payload: &str) -> Result<()>;

    /// Remove and return the head of `queue`, waiting up to `block` for one
    /// to arrive. A zero `block` waits indefinitely.
    async fn get(&self, queue: &str, block: Duration) -> Result<Option<String>>;

    /// Snapshot of the payloads in the inclusive index range, without
    /// removing them. Negative indices count from the tail.
    async fn list(&self, queue: &str, start: i64, end: i64) -> Result<Vec<String>>;

    /// Number of payloads waiting in `queue`
    async fn depth(&self, queue: &str) -> Result<usize>;
}

/// libSQL implementation of `JobQueue`
#[derive(Clone)]
pub struct LibSqlJobQueue {
    db: Arc<Database>,
    notify: Arc<Notify>,
    poll_interval: Duration,
}

impl LibSqlJobQueue {
    /// Wrap an opened database
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            notify: Arc::new(Notify::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Open (or create) the queue database at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory queue (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    /// Set how often a blocked `get` re-checks the database.
    ///
    /// Pushes made through this handle (or its clones) wake waiters
    /// immediately; the interval only bounds latency for pushes made by
    /// other processes.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn try_pop(&self, queue: &str) -> Result<Option<String>> {
        let mut rows = self
            .db
            .connection()
            .query(
                "DELETE FROM job_queue
                 WHERE id = (SELECT id FROM job_queue WHERE queue = ?1 ORDER BY id LIMIT 1)
                 RETURNING payload",
                [queue],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }
}

impl JobQueue for LibSqlJobQueue {
    async fn put(&self, queue: &str, payload: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.db
            .connection()
            .execute(
                "INSERT INTO job_queue (queue, payload, enqueued_at) VALUES (?1, ?2, ?3)",
                libsql::params![queue, payload, now],
            )
            .await?;

        self.notify.notify_waiters();
        Ok(())
    }

    async fn get(&self, queue: &str, block: Duration) -> Result<Option<String>> {
        let deadline = (!block.is_zero()).then(|| Instant::now() + block);

        loop {
            // Register interest before checking so a push between the check
            // and the wait is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.try_pop(queue).await? {
                return Ok(Some(payload));
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    (deadline - now).min(self.poll_interval)
                }
                None => self.poll_interval,
            };

            tokio::select! {
                () = &mut notified => {}
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn list(&self, queue: &str, start: i64, end: i64) -> Result<Vec<String>> {
        let depth = self.depth(queue).await? as i64;
        let Some((offset, limit)) = resolve_range(depth, start, end) else {
            return Ok(Vec::new());
        };

        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT payload FROM job_queue WHERE queue = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
                libsql::params![queue, limit, offset],
            )
            .await?;

        let mut payloads = Vec::new();
        while let Some(row) = rows.next().await? {
            payloads.push(row.get::<String>(0)?);
        }
        Ok(payloads)
    }

    async fn depth(&self, queue: &str) -> Result<usize> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT COUNT(*) FROM job_queue WHERE queue = ?1", [queue])
            .await?;

        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Turn an inclusive, possibly negative index range into `(offset, limit)`.
fn resolve_range(len: i64, start: i64, end: i64) -> Option<(i64, i64)> {
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };

    if start >= len || start > end {
        None
    } else {
        Some((start, end - start + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const TEST_QUEUE: &str = "test-queue";

    async fn setup() -> LibSqlJobQueue {
        LibSqlJobQueue::open_in_memory()
            .await
            .unwrap()
            .with_poll_interval(Duration::from_millis(20))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_get() {
        let queue = setup().await;
        queue.put(TEST_QUEUE, "test-value").await.unwrap();

        let payload = queue.get(TEST_QUEUE, Duration::from_secs(1)).await.unwrap();
        assert_eq!(payload.as_deref(), Some("test-value"));
        assert_eq!(queue.depth(TEST_QUEUE).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fifo_order() {
        let queue = setup().await;
        queue.put(TEST_QUEUE, "A").await.unwrap();
        queue.put(TEST_QUEUE, "B").await.unwrap();

        let block = Duration::from_secs(1);
        assert_eq!(queue.get(TEST_QUEUE, block).await.unwrap().as_deref(), Some("A"));
        assert_eq!(queue.get(TEST_QUEUE, block).await.unwrap().as_deref(), Some("B"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_times_out_on_empty_queue() {
        let queue = setup().await;

        let started = Instant::now();
        let payload = queue
            .get(TEST_QUEUE, Duration::from_millis(100))
            .await
            .unwrap();

        assert!(payload.is_none());
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocked_get_wakes_on_put() {
        let queue = setup().await.with_poll_interval(Duration::from_secs(30));

        let (payload, ()) = tokio::join!(queue.get(TEST_QUEUE, Duration::ZERO), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue.put(TEST_QUEUE, "late").await.unwrap();
        });

        assert_eq!(payload.unwrap().as_deref(), Some("late"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_list_is_non_destructive() {
        let queue = setup().await;
        queue.put(TEST_QUEUE, "test-value").await.unwrap();

        assert_eq!(
            queue.list(TEST_QUEUE, 0, 10).await.unwrap(),
            vec!["test-value".to_string()]
        );
        assert_eq!(queue.depth(TEST_QUEUE).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_ranges() {
        let queue = setup().await;
        for payload in ["a", "b", "c", "d"] {
            queue.put(TEST_QUEUE, payload).await.unwrap();
        }

        assert_eq!(queue.list(TEST_QUEUE, 1, 2).await.unwrap(), vec!["b", "c"]);
        assert_eq!(queue.list(TEST_QUEUE, 0, -1).await.unwrap().len(), 4);
        assert_eq!(queue.list(TEST_QUEUE, -2, -1).await.unwrap(), vec!["c", "d"]);
        assert!(queue.list(TEST_QUEUE, 5, 10).await.unwrap().is_empty());
        assert!(queue.list(TEST_QUEUE, 3, 1).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_queues_are_independent() {
        let queue = setup().await;
        queue.put("queue:sync", "sync-job").await.unwrap();
        queue.put("queue:other", "other-job").await.unwrap();

        let payload = queue
            .get("queue:other", Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(payload.as_deref(), Some("other-job"));
        assert_eq!(queue.depth("queue:sync").await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_payloads_survive_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("queue.db");

        {
            let queue = LibSqlJobQueue::open(&path).await.unwrap();
            queue.put(TEST_QUEUE, "durable").await.unwrap();
        }

        let queue = LibSqlJobQueue::open(&path).await.unwrap();
        let payload = queue.get(TEST_QUEUE, Duration::from_millis(100)).await.unwrap();
        assert_eq!(payload.as_deref(), Some("durable"));
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(4, 0, 10), Some((0, 4)));
        assert_eq!(resolve_range(4, -1, -1), Some((3, 1)));
        assert_eq!(resolve_range(4, -10, 1), Some((0, 2)));
        assert_eq!(resolve_range(0, 0, -1), None);
        assert_eq!(resolve_range(4, 4, 4), None);
    }
}
