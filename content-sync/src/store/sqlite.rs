//! SQLite-backed node registry

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::{NodeRegistry, RegisterOutcome};
use crate::nodes::{GraphNode, NodeId};

const CREATE_NODES: &str = "CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY NOT NULL,
    type TEXT NOT NULL,
    content_digest TEXT NOT NULL,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const CREATE_TYPE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes (type)";

/// Node registry persisted in a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteNodeStore {
    pool: SqlitePool,
}

impl SqliteNodeStore {
    /// Open (creating if needed) the database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open node database {}", path.display()))?;

        debug!("Opened node database at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Database that lives only as long as the store
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Failed to parse in-memory database URL")?;
        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory node database")?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_NODES)
            .execute(&pool)
            .await
            .context("Failed to create nodes table")?;
        sqlx::query(CREATE_TYPE_INDEX)
            .execute(&pool)
            .await
            .context("Failed to create nodes index")?;

        Ok(Self { pool })
    }
}

fn decode_node(payload: &str) -> Result<GraphNode> {
    serde_json::from_str(payload).context("Failed to decode stored node")
}

#[async_trait]
impl NodeRegistry for SqliteNodeStore {
    async fn register(&self, node: GraphNode) -> Result<RegisterOutcome> {
        let id = node.id.to_string();
        let payload = serde_json::to_string(&node).context("Failed to encode node")?;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let existing: Option<(String,)> = sqlx::query_as("SELECT payload FROM nodes WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up node")?;
        let existing = existing.map(|(payload,)| decode_node(&payload)).transpose()?;

        let outcome = RegisterOutcome::classify(existing.as_ref(), &node);
        if outcome == RegisterOutcome::Unchanged {
            return Ok(outcome);
        }

        sqlx::query(
            "INSERT INTO nodes (id, type, content_digest, payload, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                type = excluded.type,
                content_digest = excluded.content_digest,
                payload = excluded.payload,
                updated_at = excluded.updated_at",
        )
        .bind(&id)
        .bind(node.type_name())
        .bind(node.digest().as_str())
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to write node")?;

        tx.commit().await.context("Failed to commit node")?;

        Ok(outcome)
    }

    async fn get(&self, id: &NodeId) -> Result<Option<GraphNode>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT payload FROM nodes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get node")?;

        row.map(|(payload,)| decode_node(&payload)).transpose()
    }

    async fn nodes_by_type(&self, type_name: &str) -> Result<Vec<GraphNode>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT payload FROM nodes WHERE type = ? ORDER BY id")
                .bind(type_name)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list nodes")?;

        rows.iter().map(|(payload,)| decode_node(payload)).collect()
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count nodes")?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EntityType;
    use crate::services::sync::Synchronizer;
    use serde_json::json;

    fn post(id: i64, description: &str) -> GraphNode {
        Synchronizer::new("test")
            .synchronize_record(EntityType::Post, 0, &json!({ "id": id, "description": description }))
            .unwrap()
            .into_node()
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let store = SqliteNodeStore::in_memory().await.unwrap();
        let node = post(1, "hello");

        assert_eq!(store.register(node.clone()).await.unwrap(), RegisterOutcome::Created);
        assert_eq!(store.get(&node.id).await.unwrap(), Some(node.clone()));
        assert_eq!(store.register(node.clone()).await.unwrap(), RegisterOutcome::Unchanged);
        assert_eq!(store.register(post(1, "edited")).await.unwrap(), RegisterOutcome::Updated);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_link_change_is_an_update() {
        let store = SqliteNodeStore::in_memory().await.unwrap();
        let node = post(1, "hello");
        store.register(node.clone()).await.unwrap();

        let mut linked = node.clone();
        linked.links.insert("author".to_string(), post(2, "x").id);

        assert_eq!(store.register(linked).await.unwrap(), RegisterOutcome::Updated);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nodes.db");

        {
            let store = SqliteNodeStore::open(&path).await.unwrap();
            store.register(post(1, "a")).await.unwrap();
            store.register(post(2, "b")).await.unwrap();
        }

        let store = SqliteNodeStore::open(&path).await.unwrap();
        let posts = store.nodes_by_type("Post").await.unwrap();
        assert_eq!(posts.len(), 2);
        assert!(store.nodes_by_type("Author").await.unwrap().is_empty());
    }
}
