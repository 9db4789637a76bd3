// src/services/walker.rs

//! Offset pagination over one window or one participant partition.
//!
//! A walk starts at cursor 0 and advances by the page size after each fetch.
//! It stops when the source runs dry, when a record signals that the window
//! has been passed, or when the cursor reaches the caller's estimate of the
//! total record count. The estimate bounds the walk even if the source never
//! reports exhaustion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{EntityHandle, ParticipantFilter, RawRecord};
use crate::services::SkipReason;
use crate::source::{MessageSource, ParticipantSource};

/// One page of raw records.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<RawRecord>,
    pub has_more: bool,
}

impl Page {
    /// A page as returned by an offset-paginated API: an empty page means the
    /// sequence is exhausted. A short page does not, since the remote side
    /// may cap page sizes below the requested limit.
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        let has_more = !records.is_empty();
        Self { records, has_more }
    }
}

/// Fetches the page starting at `cursor`.
#[async_trait]
pub trait PageFetch: Send + Sync {
    async fn fetch(&self, cursor: usize, limit: usize) -> Result<Page>;
}

/// Per-record instruction returned to the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<K> {
    Keep(K),
    Skip(SkipReason),
    /// Stop the walk; the rest of the current page is not examined.
    Stop,
}

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    WindowExceeded,
    EstimateReached,
}

/// Advisory progress of a walk, reported after every page.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub label: String,
    pub cursor: usize,
    pub estimated_total: usize,
}

impl Progress {
    /// `cursor / estimated_total` as a percentage. May exceed 100.
    pub fn percent(&self) -> f64 {
        if self.estimated_total == 0 {
            return 100.0;
        }
        self.cursor as f64 / self.estimated_total as f64 * 100.0
    }
}

pub type ProgressFn = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Result of one completed walk.
#[derive(Debug, Clone)]
pub struct WalkOutcome<K> {
    pub kept: Vec<K>,
    pub fetches: usize,
    pub cursor: usize,
    pub skipped: HashMap<SkipReason, usize>,
    pub stop: StopReason,
}

impl<K> WalkOutcome<K> {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Drives sequential page fetches for a single walk.
#[derive(Clone)]
pub struct PageWalker {
    page_size: usize,
    estimated_total: usize,
    delay: Duration,
    progress: Option<ProgressFn>,
}

impl PageWalker {
    pub fn new(page_size: usize, estimated_total: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            estimated_total,
            delay: Duration::ZERO,
            progress: None,
        }
    }

    /// Sleep this long between consecutive fetches.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Walk `pages`, passing each record to `classify`.
    ///
    /// A failed fetch ends the walk with `AppError::FetchFailed`; records kept
    /// so far are discarded with it.
    pub async fn walk<K, F>(
        &self,
        label: &str,
        pages: &dyn PageFetch,
        mut classify: F,
    ) -> Result<WalkOutcome<K>>
    where
        K: Send,
        F: FnMut(&RawRecord) -> Step<K> + Send,
    {
        let mut kept = Vec::new();
        let mut skipped: HashMap<SkipReason, usize> = HashMap::new();
        let mut cursor = 0;
        let mut fetches = 0;

        let stop = loop {
            if fetches > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let page = pages
                .fetch(cursor, self.page_size)
                .await
                .map_err(|e| match e {
                    AppError::FetchFailed { .. } => e,
                    other => AppError::fetch_failed(label, cursor, other),
                })?;
            fetches += 1;

            let mut exceeded = false;
            for record in &page.records {
                match classify(record) {
                    Step::Keep(row) => kept.push(row),
                    Step::Skip(reason) => *skipped.entry(reason).or_default() += 1,
                    Step::Stop => {
                        exceeded = true;
                        break;
                    }
                }
            }

            cursor += self.page_size;
            self.report(label, cursor);

            if exceeded {
                break StopReason::WindowExceeded;
            }
            if !page.has_more {
                break StopReason::Exhausted;
            }
            if cursor >= self.estimated_total {
                break StopReason::EstimateReached;
            }
        };

        log::debug!(
            "{}: stopped ({:?}) after {} fetches, {} kept, {} skipped",
            label,
            stop,
            fetches,
            kept.len(),
            skipped.values().sum::<usize>()
        );

        Ok(WalkOutcome {
            kept,
            fetches,
            cursor,
            skipped,
            stop,
        })
    }

    fn report(&self, label: &str, cursor: usize) {
        let progress = Progress {
            label: label.to_string(),
            cursor,
            estimated_total: self.estimated_total,
        };
        log::info!("{}: {:.2}%", label, progress.percent());
        if let Some(callback) = &self.progress {
            callback(&progress);
        }
    }
}

/// Message history pages ending at a window's upper bound.
pub struct MessagePages<'a> {
    pub source: &'a dyn MessageSource,
    pub entity: &'a EntityHandle,
    pub end_of_window: DateTime<Utc>,
}

#[async_trait]
impl PageFetch for MessagePages<'_> {
    async fn fetch(&self, cursor: usize, limit: usize) -> Result<Page> {
        let records = self
            .source
            .fetch_messages(self.entity, self.end_of_window, cursor, limit)
            .await?;
        Ok(Page::from_records(records))
    }
}

/// Participant pages for one server-side filter.
pub struct ParticipantPages<'a> {
    pub source: &'a dyn ParticipantSource,
    pub entity: &'a EntityHandle,
    pub filter: &'a ParticipantFilter,
}

#[async_trait]
impl PageFetch for ParticipantPages<'_> {
    async fn fetch(&self, cursor: usize, limit: usize) -> Result<Page> {
        let records = self
            .source
            .fetch_participants(self.entity, self.filter, cursor, limit)
            .await?;
        Ok(Page::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves pre-built pages and records every cursor it was asked for.
    struct ScriptedPages {
        pages: Vec<Page>,
        cursors: Mutex<Vec<usize>>,
        fail_at: Option<usize>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Page>) -> Self {
            Self {
                pages,
                cursors: Mutex::new(Vec::new()),
                fail_at: None,
            }
        }

        fn calls(&self) -> Vec<usize> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetch for ScriptedPages {
        async fn fetch(&self, cursor: usize, _limit: usize) -> Result<Page> {
            let call = {
                let mut cursors = self.cursors.lock().unwrap();
                cursors.push(cursor);
                cursors.len() - 1
            };
            if self.fail_at == Some(call) {
                return Err(AppError::S3("connection reset".into()));
            }
            Ok(self.pages.get(call).cloned().unwrap_or_default())
        }
    }

    fn numbered_page(start: i64, count: i64) -> Page {
        Page {
            records: (start..start + count)
                .map(|n| RawRecord::new(json!({ "n": n })))
                .collect(),
            has_more: true,
        }
    }

    fn number(record: &RawRecord) -> i64 {
        record.as_value()["n"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_stops_at_estimate() {
        let pages = ScriptedPages::new((0..10).map(|i| numbered_page(i * 10, 10)).collect());
        let walker = PageWalker::new(10, 25);
        let outcome = walker
            .walk("t", &pages, |r| Step::Keep(number(r)))
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::EstimateReached);
        assert_eq!(pages.calls(), vec![0, 10, 20]);
        assert_eq!(outcome.kept.len(), 30);
        assert_eq!(outcome.cursor, 30);
    }

    #[tokio::test]
    async fn test_stops_when_source_is_exhausted() {
        let pages = ScriptedPages::new(vec![numbered_page(0, 10), Page::from_records(vec![])]);
        let outcome = PageWalker::new(10, 1_000)
            .walk("t", &pages, |r| Step::Keep(number(r)))
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Exhausted);
        assert_eq!(outcome.fetches, 2);
        assert_eq!(outcome.kept.len(), 10);
    }

    #[tokio::test]
    async fn test_stop_discards_rest_of_page() {
        let pages = ScriptedPages::new(vec![numbered_page(0, 10), numbered_page(10, 10)]);
        let outcome = PageWalker::new(10, 1_000)
            .walk("t", &pages, |r| match number(r) {
                14 => Step::Stop,
                n => Step::Keep(n),
            })
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::WindowExceeded);
        assert_eq!(outcome.fetches, 2);
        assert_eq!(outcome.kept, (0..14).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_skips_are_counted_not_fatal() {
        let pages = ScriptedPages::new(vec![numbered_page(0, 6), Page::default()]);
        let outcome = PageWalker::new(6, 100)
            .walk("t", &pages, |r| {
                if number(r) % 2 == 0 {
                    Step::Skip(SkipReason::Malformed)
                } else {
                    Step::Keep(number(r))
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.kept, vec![1, 3, 5]);
        assert_eq!(outcome.skipped.get(&SkipReason::Malformed), Some(&3));
        assert_eq!(outcome.skipped_total(), 3);
    }

    #[tokio::test]
    async fn test_fetch_error_is_fetch_failed() {
        let mut pages = ScriptedPages::new((0..5).map(|i| numbered_page(i * 10, 10)).collect());
        pages.fail_at = Some(1);
        let result = PageWalker::new(10, 1_000)
            .walk("window 01-03-23", &pages, |r| Step::Keep(number(r)))
            .await;

        match result {
            Err(AppError::FetchFailed { context, cursor, .. }) => {
                assert_eq!(context, "window 01-03-23");
                assert_eq!(cursor, 10);
            }
            other => panic!("expected FetchFailed, got {:?}", other.map(|o| o.kept)),
        }
        assert_eq!(pages.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_count_is_bounded_by_estimate() {
        for (page_size, estimate) in [(500, 1_200), (100, 100), (200, 0), (7, 50)] {
            let pages = ScriptedPages::new(
                (0..100).map(|i| numbered_page(i * page_size as i64, page_size as i64)).collect(),
            );
            let outcome = PageWalker::new(page_size, estimate)
                .walk("t", &pages, |_| Step::<()>::Skip(SkipReason::TooShort))
                .await
                .unwrap();
            let bound = estimate.div_ceil(page_size) + 1;
            assert!(
                outcome.fetches <= bound,
                "{} fetches for estimate {} / page {}",
                outcome.fetches,
                estimate,
                page_size
            );
        }
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pages = ScriptedPages::new((0..4).map(|i| numbered_page(i * 10, 10)).collect());
        PageWalker::new(10, 40)
            .with_progress(Arc::new(move |p: &Progress| sink.lock().unwrap().push(p.percent())))
            .walk("t", &pages, |r| Step::Keep(number(r)))
            .await
            .unwrap();

        let percents = seen.lock().unwrap().clone();
        assert_eq!(percents, vec![25.0, 50.0, 75.0, 100.0]);
    }
}
