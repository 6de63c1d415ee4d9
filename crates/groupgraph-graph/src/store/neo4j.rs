//! [`GraphStore`] backed by a Neo4j server.

use async_trait::async_trait;
use neo4rs::Query;
use tracing::debug;

use groupgraph_core::{GgResult, GroupGraphError};

use super::cypher::{self, Param, Statement};
use super::{EdgeKind, GraphStore, Write};
use crate::client::{GraphClient, GraphCounts};

/// Map a client error, flagging connection-level driver failures as transient.
pub(crate) fn store_error(e: anyhow::Error) -> GroupGraphError {
    let transient = e.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<neo4rs::Error>(),
            Some(neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError)
        )
    });
    GroupGraphError::Store {
        message: format!("{e:#}"),
        transient,
    }
}

fn into_query(statement: Statement) -> Query {
    statement
        .params
        .into_iter()
        .fold(Query::new(statement.text.to_string()), |query, (key, value)| match value {
            Param::Str(v) => query.param(key, v),
            Param::Int(v) => query.param(key, v),
            Param::Bool(v) => query.param(key, v),
            Param::StrList(v) => query.param(key, v),
        })
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn apply(&self, writes: &[Write]) -> GgResult<()> {
        let queries = writes.iter().map(|w| into_query(cypher::statement(w))).collect();
        self.run_in_transaction(queries).await.map_err(store_error)?;
        debug!(writes = writes.len(), "Committed unit of work");
        Ok(())
    }

    async fn counts(&self) -> GgResult<GraphCounts> {
        self.get_counts().await.map_err(store_error)
    }

    async fn edge_count(&self, kind: EdgeKind) -> GgResult<usize> {
        let query = Query::new(cypher::edge_count_query(kind).to_string());
        let count: i64 = self
            .query_scalar(query, "count")
            .await
            .map_err(store_error)?
            .unwrap_or(0);
        Ok(count.max(0) as usize)
    }

    async fn message_group_ids(&self) -> GgResult<Vec<String>> {
        let rows = self
            .query(Query::new(cypher::MESSAGE_GROUP_IDS.to_string()))
            .await
            .map_err(store_error)?;
        // Rows without a group_id property come back as null and are skipped.
        Ok(rows
            .iter()
            .filter_map(|row| row.get::<String>("group_id").ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_errors_are_permanent() {
        let err = store_error(anyhow::anyhow!("syntax error").context("Neo4j query failed"));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_io_errors_are_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = store_error(anyhow::Error::new(neo4rs::Error::IOError { detail: io }).context("commit"));
        assert!(err.is_transient());
    }
}
