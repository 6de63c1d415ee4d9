//! The `sync` command.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tracing::warn;

use groupgraph_api::{GroupMeClient, MAX_MESSAGE_LIMIT};
use groupgraph_core::model::Group;
use groupgraph_core::Settings;
use groupgraph_graph::sync::SkippedEntity;
use groupgraph_graph::{
    initialize_schema, reconcile, FailurePolicy, GraphClient, GraphStore, MemoryGraph, RetryPolicy, SyncDriver,
    SyncObserver, SyncOptions, SyncReport,
};

use super::graph::print_reconcile_report;
use super::Neo4jArgs;
use crate::output::truncate_visual;

#[derive(Args)]
pub struct SyncArgs {
    /// Groups requested per page
    #[arg(long, default_value_t = 100)]
    pub per_page: u32,

    /// Messages requested per page
    #[arg(long, default_value_t = MAX_MESSAGE_LIMIT)]
    pub limit: u32,

    /// Only sync this group (repeatable)
    #[arg(long = "group", value_name = "GROUP_ID")]
    pub groups: Vec<String>,

    /// Stop after this many message pages per group
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Stop at the first failed entity instead of skipping it
    #[arg(long)]
    pub abort_on_error: bool,

    /// Attempts per graph write when the connection fails
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Fetch and upsert into an in-memory graph instead of Neo4j
    #[arg(long)]
    pub dry_run: bool,

    /// Run a reconcile pass after the sync
    #[arg(long)]
    pub reconcile: bool,
}

impl SyncArgs {
    fn options(&self) -> SyncOptions {
        SyncOptions {
            per_page: self.per_page,
            message_limit: self.limit.clamp(1, MAX_MESSAGE_LIMIT),
            group_ids: self.groups.clone(),
            max_pages_per_group: self.max_pages,
            failure_policy: if self.abort_on_error {
                FailurePolicy::Abort
            } else {
                FailurePolicy::SkipEntity
            },
            retry: RetryPolicy {
                attempts: self.retries.max(1),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Renders sync progress as a bar over groups.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl SyncObserver for ProgressObserver {
    fn groups_fetched(&self, count: usize) {
        self.bar.set_length(count as u64);
    }

    fn group_started(&self, group: &Group) {
        self.bar.set_message(truncate_visual(&group.name, 30));
    }

    fn page_upserted(&self, group: &Group, messages: usize) {
        self.bar
            .set_message(format!("{} (+{} messages)", truncate_visual(&group.name, 30), messages));
    }

    fn group_finished(&self, _group: &Group, _messages: usize) {
        self.bar.inc(1);
    }

    fn entity_skipped(&self, skipped: &SkippedEntity) {
        self.bar
            .println(format!("{} {} {}: {}", "skipped".yellow(), skipped.kind, skipped.id, skipped.reason));
    }
}

pub async fn execute(args: SyncArgs, settings_path: &Path, neo4j: &Neo4jArgs) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let api = GroupMeClient::new(&settings)?;

    let memory;
    let client: GraphClient;
    let store: &dyn GraphStore = if args.dry_run {
        println!("{}", "Dry run: writing to an in-memory graph.".yellow());
        memory = MemoryGraph::new();
        &memory
    } else {
        client = neo4j.connect().await?;
        initialize_schema(&client).await.context("Failed to initialize schema")?;
        &client
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current write");
            cancel_tx.send_replace(true);
        }
    });

    println!("{}", "Syncing GroupMe into the graph...".bold());
    let observer = ProgressObserver::new();
    let result = SyncDriver::new(&api, store, args.options())
        .with_observer(&observer)
        .with_cancel(cancel_rx)
        .run()
        .await;
    observer.bar.finish_and_clear();

    let report = result.context("Sync failed")?;
    print_sync_report(&report);

    if args.reconcile {
        let reconciled = reconcile(store).await.context("Reconcile failed")?;
        print_reconcile_report(&reconciled);
    }

    if args.dry_run {
        let counts = store.counts().await?;
        println!(
            "\n  In-memory graph: {} nodes, {} relationships",
            counts.nodes, counts.relationships
        );
    }
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    println!("\n{}", "Sync complete:".green().bold());
    println!("  Groups:        {}", report.groups);
    println!("  Members:       {}", report.members);
    println!("  Messages:      {}", report.messages);
    println!("  Attachments:   {}", report.attachments);
    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Elapsed:       {:.1}s", report.elapsed.as_secs_f64());

    if !report.skipped.is_empty() {
        println!("\n{} ({}):", "Skipped".yellow().bold(), report.skipped.len());
        for skipped in &report.skipped {
            println!("  {} {} {}", skipped.kind, skipped.id.dimmed(), skipped.reason);
        }
    }
}
