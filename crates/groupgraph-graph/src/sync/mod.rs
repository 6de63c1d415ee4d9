//! GroupMe to Neo4j synchronization pipeline.
//!
//! Fetches every group of the caller, upserts the groups with their rosters,
//! then walks each group's message history from newest to oldest, one page
//! at a time, until the API returns an empty page.

mod report;

use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use groupgraph_core::model::{sort_chronologically, Group};
use groupgraph_core::{GgResult, GroupGraphError, GroupSource, MessageCursor};

use crate::store::GraphStore;
use crate::upsert::{RetryPolicy, UpsertEngine};

pub use report::{EntityKind, SkippedEntity, SyncReport};

/// What a run does when a single entity fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first error.
    Abort,
    /// Record the entity in the report and continue. Fatal errors still stop
    /// the run.
    #[default]
    SkipEntity,
}

/// Knobs for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Groups requested per page.
    pub per_page: u32,
    /// Messages requested per page (the API caps this at 100).
    pub message_limit: u32,
    /// Only sync these groups; empty means all.
    pub group_ids: Vec<String>,
    /// Stop paging a group's history after this many pages.
    pub max_pages_per_group: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            per_page: 100,
            message_limit: 100,
            group_ids: Vec::new(),
            max_pages_per_group: None,
            failure_policy: FailurePolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Progress callbacks from a sync run. All methods default to no-ops.
pub trait SyncObserver: Send + Sync {
    fn groups_fetched(&self, _count: usize) {}
    fn group_started(&self, _group: &Group) {}
    fn page_upserted(&self, _group: &Group, _messages: usize) {}
    fn group_finished(&self, _group: &Group, _messages: usize) {}
    fn entity_skipped(&self, _skipped: &SkippedEntity) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Drives a full sync from a [`GroupSource`] into a [`GraphStore`].
pub struct SyncDriver<'a> {
    source: &'a dyn GroupSource,
    engine: UpsertEngine<'a>,
    options: SyncOptions,
    observer: &'a dyn SyncObserver,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a> SyncDriver<'a> {
    pub fn new(source: &'a dyn GroupSource, store: &'a dyn GraphStore, options: SyncOptions) -> Self {
        let engine = UpsertEngine::new(store).with_retry(options.retry);
        Self {
            source,
            engine,
            options,
            observer: &NoopObserver,
            cancel: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn SyncObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Stop the run with [`GroupGraphError::Cancelled`] once `cancel` reads `true`.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Run the sync to completion.
    pub async fn run(&self) -> GgResult<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::default();

        let groups = self.fetch_groups().await?;
        info!(groups = groups.len(), "Fetched groups");
        self.observer.groups_fetched(groups.len());

        let mut synced = Vec::with_capacity(groups.len());
        for group in groups {
            self.check_cancelled()?;
            match self.engine.upsert_group(&group).await {
                Ok(outcome) => {
                    report.record(&outcome.stats);
                    for (user_id, e) in outcome.failed_members {
                        self.absorb(&mut report, EntityKind::Member, &user_id, e)?;
                    }
                    synced.push(group);
                }
                Err(e) => self.absorb(&mut report, EntityKind::Group, &group.id, e)?,
            }
        }

        for group in &synced {
            self.sync_messages(group, &mut report).await?;
        }

        report.elapsed = started.elapsed();
        info!(
            groups = report.groups,
            members = report.members,
            messages = report.messages,
            attachments = report.attachments,
            pages = report.pages_fetched,
            skipped = report.skipped.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Sync complete"
        );
        Ok(report)
    }

    /// Every group page until a short or empty one, narrowed to `group_ids`.
    async fn fetch_groups(&self) -> GgResult<Vec<Group>> {
        let per_page = self.options.per_page.max(1);
        let mut groups = Vec::new();
        let mut page = 1;
        loop {
            self.check_cancelled()?;
            let batch = self.source.groups(page, per_page, false).await?;
            debug!(page, count = batch.len(), "Fetched group page");
            let last = batch.len() < per_page as usize;
            groups.extend(batch);
            if last {
                break;
            }
            page += 1;
        }

        if !self.options.group_ids.is_empty() {
            groups.retain(|g| self.options.group_ids.contains(&g.id));
        }
        Ok(groups)
    }

    /// Page through one group's history, newest page first.
    async fn sync_messages(&self, group: &Group, report: &mut SyncReport) -> GgResult<()> {
        info!(group_id = %group.id, name = %group.name, "Syncing messages");
        self.observer.group_started(group);

        let mut cursor = MessageCursor::Latest;
        let mut pages = 0;
        let mut total = 0;
        loop {
            if self.options.max_pages_per_group.is_some_and(|max| pages >= max) {
                debug!(group_id = %group.id, pages, "Page limit reached");
                break;
            }
            self.check_cancelled()?;

            let fetched = self.source.messages(&group.id, &cursor, self.options.message_limit).await;
            report.pages_fetched += 1;
            pages += 1;
            let mut page = match fetched {
                Ok(page) => page,
                Err(e) => {
                    self.absorb(report, EntityKind::MessagePage, &group.id, e)?;
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            sort_chronologically(&mut page);
            for message in &page {
                self.check_cancelled()?;
                match self.engine.upsert_message(message).await {
                    Ok(stats) => report.record(&stats),
                    Err(e) => self.absorb(report, EntityKind::Message, &message.id, e)?,
                }
            }
            total += page.len();
            self.observer.page_upserted(group, page.len());

            cursor = MessageCursor::Before(page[0].id.clone());
        }

        info!(group_id = %group.id, messages = total, pages, "Group synced");
        self.observer.group_finished(group, total);
        Ok(())
    }

    /// Record a failed entity, or hand the error back when the run must stop.
    fn absorb(&self, report: &mut SyncReport, kind: EntityKind, id: &str, error: GroupGraphError) -> GgResult<()> {
        if self.options.failure_policy == FailurePolicy::Abort || error.is_fatal() {
            return Err(error);
        }
        warn!(%kind, id, error = %error, "Skipping entity");
        let skipped = SkippedEntity {
            kind,
            id: id.to_string(),
            reason: error.to_string(),
        };
        self.observer.entity_skipped(&skipped);
        report.skipped.push(skipped);
        Ok(())
    }

    fn check_cancelled(&self) -> GgResult<()> {
        match &self.cancel {
            Some(cancel) if *cancel.borrow() => Err(GroupGraphError::Cancelled),
            _ => Ok(()),
        }
    }
}
