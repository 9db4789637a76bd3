// src/pipeline/crawl.rs

//! Top-level crawl driver.
//!
//! Resolves the group, plans windows, walks each one and hands every
//! completed result set to the sink before starting the next window. A
//! window that fails to fetch or persist ends the run; windows completed
//! before it stay written and are listed in the report.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::OnceCell;

use crate::error::{AppError, Result};
use crate::models::{
    Config, CrawlMode, EntityHandle, GroupRef, MessageRecord, ParticipantCategory,
    ParticipantRecord, PartitionKey, RawRecord, ResultSet, Window,
};
use crate::services::{
    ExclusionFilter, ExclusionSet, ExclusionSource, MessagePages, PageWalker, ParticipantPages,
    ProgressFn, SkipReason, Step, Verdict, WalkOutcome, WindowPlan, WindowPlanner, classify,
    classify_participant,
};
use crate::source::{EntityResolver, MessageSource, ParticipantSource, RemoteApi};
use crate::storage::{Columnar, ResultSink};
use crate::utils::dates;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A window whose result set was written.
#[derive(Debug, Clone)]
pub struct CompletedWindow {
    pub window: Window,
    pub result: ResultSet<MessageRecord>,
    pub location: String,
    pub fetches: usize,
    pub skipped: HashMap<SkipReason, usize>,
}

/// The window that ended a run.
#[derive(Debug)]
pub struct WindowFailure {
    pub window: Window,
    pub error: AppError,
}

/// Outcome of a message crawl.
#[derive(Debug)]
pub struct MessageCrawlReport {
    pub group: String,
    pub completed: Vec<CompletedWindow>,
    pub failure: Option<WindowFailure>,
    /// Windows that were planned but never started.
    pub skipped_windows: usize,
}

impl MessageCrawlReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    pub fn partitions(&self) -> Vec<&PartitionKey> {
        self.completed.iter().map(|c| c.result.partition()).collect()
    }

    pub fn record_count(&self) -> usize {
        self.completed.iter().map(|c| c.result.len()).sum()
    }
}

/// Outcome of a participant crawl.
#[derive(Debug, Clone)]
pub struct ParticipantCrawlReport {
    pub category: ParticipantCategory,
    pub result: ResultSet<ParticipantRecord>,
    pub location: String,
    pub fetches: usize,
    /// Records dropped because an earlier partition already returned them.
    pub duplicates: usize,
}

/// Drives crawls against one remote API and one sink.
pub struct CrawlOrchestrator {
    resolver: Arc<dyn EntityResolver>,
    messages: Arc<dyn MessageSource>,
    participants: Arc<dyn ParticipantSource>,
    sink: Arc<dyn ResultSink>,
    exclusion_source: Option<Arc<dyn ExclusionSource>>,
    exclusions: OnceCell<Arc<ExclusionSet>>,
    config: Arc<Config>,
    progress: Option<ProgressFn>,
    clock: Clock,
}

impl CrawlOrchestrator {
    pub fn new<R>(remote: Arc<R>, sink: Arc<dyn ResultSink>, config: Arc<Config>) -> Self
    where
        R: RemoteApi + 'static,
    {
        Self {
            resolver: remote.clone(),
            messages: remote.clone(),
            participants: remote,
            sink,
            exclusion_source: None,
            exclusions: OnceCell::new(),
            config,
            progress: None,
            clock: Arc::new(Utc::now),
        }
    }

    /// Suppress authors listed in snapshots from `source`. Without one, no
    /// records are excluded.
    pub fn with_exclusion_source(mut self, source: Arc<dyn ExclusionSource>) -> Self {
        self.exclusion_source = Some(source);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Windows `mode` expands to right now.
    pub fn plan(&self, mode: &CrawlMode) -> Result<WindowPlan> {
        WindowPlanner::new(self.config.crawler.offset()?).plan(mode, (self.clock)())
    }

    /// Crawl messages of `group` for every window of `mode`.
    ///
    /// Fails outright on an invalid range or an unknown group. Fetch and
    /// sink failures are reported in the returned report instead.
    pub async fn crawl_messages(
        &self,
        group: &GroupRef,
        estimated_total: usize,
        mode: &CrawlMode,
    ) -> Result<MessageCrawlReport> {
        let plan = self.plan(mode)?;
        let entity = self.resolver.resolve(group).await?;
        let exclusion = self.exclusions().await?;

        let short_name = group.short_name();
        let group_ref = group.to_string();
        log::info!(
            "Downloading messages from {} ({} window(s), mode {})",
            group_ref,
            plan.len(),
            mode
        );

        let mut report = MessageCrawlReport {
            group: group_ref.clone(),
            completed: Vec::new(),
            failure: None,
            skipped_windows: 0,
        };

        for window in &plan {
            match self
                .crawl_window(&entity, &window, &group_ref, &short_name, estimated_total, &exclusion)
                .await
            {
                Ok(done) => report.completed.push(done),
                Err(error) if error.is_window_scoped() => {
                    log::error!("Window {} failed: {}", window, error);
                    report.skipped_windows = plan.len() - report.completed.len() - 1;
                    report.failure = Some(WindowFailure { window, error });
                    break;
                }
                Err(error) => return Err(error),
            }
        }

        log::info!(
            "Message crawl of {}: {} window(s) written, {} record(s)",
            group_ref,
            report.completed.len(),
            report.record_count()
        );
        Ok(report)
    }

    async fn crawl_window(
        &self,
        entity: &EntityHandle,
        window: &Window,
        group_ref: &str,
        short_name: &str,
        estimated_total: usize,
        exclusion: &ExclusionSet,
    ) -> Result<CompletedWindow> {
        let label = format!("messages {}", window.label());
        let pages = MessagePages {
            source: self.messages.as_ref(),
            entity,
            end_of_window: window.end(),
        };

        let outcome = self
            .walker(self.config.messages.page_size, estimated_total)
            .walk(&label, &pages, |raw| message_step(raw, group_ref, window, exclusion))
            .await?;

        let mut result = ResultSet::new(PartitionKey::messages(window, short_name));
        let WalkOutcome {
            kept,
            fetches,
            skipped,
            ..
        } = outcome;
        result.extend(kept);

        let location = self.persist(&result).await?;
        Ok(CompletedWindow {
            window: *window,
            result,
            location,
            fetches,
            skipped,
        })
    }

    /// Crawl participants of `group` in `category`.
    ///
    /// `ALL` walks one search partition per letter, each bounded by
    /// `estimated_total` on its own, and unions the results in letter order.
    pub async fn crawl_participants(
        &self,
        group: &GroupRef,
        estimated_total: usize,
        category: ParticipantCategory,
    ) -> Result<ParticipantCrawlReport> {
        let entity = self.resolver.resolve(group).await?;
        let today = dates::day_at((self.clock)(), self.config.crawler.offset()?);
        let group_ref = group.to_string();
        let filters = category.partitions();
        let concurrency = self.config.crawler.max_concurrent.max(1);

        log::info!(
            "Downloading users {} from {} ({} partition(s))",
            category,
            group_ref,
            filters.len()
        );

        let walker = self.walker(self.config.participants.page_size, estimated_total);
        let (entity, walker, group_ref) = (&entity, &walker, group_ref.as_str());
        let outcomes: Vec<WalkOutcome<ParticipantRecord>> = stream::iter(filters.iter())
            .map(|filter| async move {
                let label = format!("users {}", filter);
                let pages = ParticipantPages {
                    source: self.participants.as_ref(),
                    entity,
                    filter,
                };
                walker
                    .walk(&label, &pages, |raw| participant_step(raw, group_ref))
                    .await
            })
            .buffered(concurrency)
            .try_collect()
            .await?;

        let mut result = ResultSet::new(PartitionKey::participants(
            category,
            today,
            &group.short_name(),
        ));
        let mut seen = HashSet::new();
        let mut fetches = 0;
        let mut duplicates = 0;
        for outcome in outcomes {
            fetches += outcome.fetches;
            for record in outcome.kept {
                if seen.insert(record.id) {
                    result.push(record);
                } else {
                    duplicates += 1;
                }
            }
        }

        let location = self.persist(&result).await?;
        log::info!(
            "User crawl of {}: {} user(s) in {} fetch(es), {} duplicate(s) dropped",
            group_ref,
            result.len(),
            fetches,
            duplicates
        );

        Ok(ParticipantCrawlReport {
            category,
            result,
            location,
            fetches,
            duplicates,
        })
    }

    fn walker(&self, page_size: usize, estimated_total: usize) -> PageWalker {
        let walker = PageWalker::new(page_size, estimated_total)
            .with_delay(Duration::from_millis(self.config.crawler.request_delay_ms));
        match &self.progress {
            Some(progress) => walker.with_progress(Arc::clone(progress)),
            None => walker,
        }
    }

    async fn persist<T: Columnar>(&self, result: &ResultSet<T>) -> Result<String> {
        let partition = result.partition();
        let batch = T::to_batch(result.rows())
            .map_err(|e| AppError::sink_write(partition.as_str(), e))?;
        self.sink.write(partition, &batch).await
    }

    /// The exclusion set, loaded on first use and shared afterwards.
    async fn exclusions(&self) -> Result<Arc<ExclusionSet>> {
        let today = dates::day_at((self.clock)(), self.config.crawler.offset()?);
        let set = self
            .exclusions
            .get_or_init(|| async {
                match &self.exclusion_source {
                    Some(source) => Arc::new(ExclusionFilter::load(source.as_ref(), today).await),
                    None => {
                        log::debug!("No exclusion source configured");
                        Arc::new(ExclusionSet::empty())
                    }
                }
            })
            .await;
        Ok(Arc::clone(set))
    }
}

fn message_step(
    raw: &RawRecord,
    group_ref: &str,
    window: &Window,
    exclusion: &ExclusionSet,
) -> Step<MessageRecord> {
    let record = match raw.decode_message(group_ref) {
        Ok(record) => record,
        Err(e) => {
            log::debug!("Skipping message: {}", e);
            return Step::Skip(SkipReason::Malformed);
        }
    };
    match classify(&record, window, exclusion) {
        Verdict::Keep => Step::Keep(record),
        Verdict::Skip(reason) => Step::Skip(reason),
        Verdict::WindowExceeded => Step::Stop,
    }
}

fn participant_step(raw: &RawRecord, group_ref: &str) -> Step<ParticipantRecord> {
    let record = match raw.decode_participant(group_ref) {
        Ok(record) => record,
        Err(e) => {
            log::debug!("Skipping user: {}", e);
            return Step::Skip(SkipReason::Malformed);
        }
    };
    match classify_participant(&record) {
        Verdict::Keep => Step::Keep(record),
        Verdict::Skip(reason) => Step::Skip(reason),
        Verdict::WindowExceeded => Step::Stop,
    }
}
