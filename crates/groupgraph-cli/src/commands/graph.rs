//! Graph maintenance commands.

use anyhow::{Context, Result};
use colored::Colorize;

use groupgraph_graph::{initialize_schema, reconcile as run_reconcile, EdgeKind, GraphStore, ReconcileReport};

use super::Neo4jArgs;

/// Backfill derivable relationships.
pub async fn reconcile(neo4j: &Neo4jArgs) -> Result<()> {
    let client = neo4j.connect().await?;
    println!("{}", "Reconciling relationships...".bold());

    let report = run_reconcile(&client).await.context("Reconcile failed")?;
    print_reconcile_report(&report);
    Ok(())
}

pub fn print_reconcile_report(report: &ReconcileReport) {
    println!("\n{}", "Reconcile complete:".green().bold());
    println!("  AUTHORED added:   {}", report.authored);
    println!("  CONTAINS added:   {}", report.contains);
    println!("  FAVORITED added:  {}", report.favorited);
    println!(
        "  REPLIED_BY change: {:+} across {} groups",
        report.reply_chain_edges, report.groups_relinked
    );
}

/// Create constraints and indexes.
pub async fn schema(neo4j: &Neo4jArgs) -> Result<()> {
    let client = neo4j.connect().await?;
    initialize_schema(&client).await.context("Failed to initialize schema")?;
    println!("{}", "Schema is up to date.".green());
    Ok(())
}

/// Show node and relationship counts.
pub async fn status(neo4j: &Neo4jArgs) -> Result<()> {
    let client = neo4j.connect().await?;

    println!("{}", "Graph Status".bold());
    println!("{}", "─".repeat(40));

    let counts = client.get_counts().await?;
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    println!();

    for kind in EdgeKind::ALL {
        let count = client
            .edge_count(kind)
            .await
            .with_context(|| format!("Failed to count {} relationships", kind.rel_type()))?;
        println!("  {:<14} {}", kind.rel_type(), count.to_string().dimmed());
    }

    println!("{}", "─".repeat(40));
    Ok(())
}
