use serde::de::DeserializeOwned;
use serde_json::json;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use ctxrag_models::{GraphEdge, GraphExport, GraphNode};

use crate::errors::{LoaderError, LoaderResult};
use crate::graphml::{EDGES_FILE, NODES_FILE};
use crate::gremlin::{bindings, GremlinClient};

pub const BATCH_SIZE_NODES: usize = 500;
pub const BATCH_SIZE_EDGES: usize = 100;

const ADD_NODE_QUERY: &str = "g.addV('entity')\
    .property('id', node_id)\
    .property('entity_type', entity_type)\
    .property('description', description)\
    .property('source_id', source_id)\
    .property('displayName', node_id)";

const ADD_EDGE_QUERY: &str = concat!(
    "g.V().has('entity', 'id', source_name).as('source')",
    ".V().has('entity', 'id', target_name).as('target')",
    ".addE(rel_type)",
    ".property('weight', weight)",
    ".property('description', description)",
    ".property('keywords', keywords)",
    ".property('source_id', source_id)",
    ".from('source').to('target')",
);

/// Counts of records submitted by a load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Uploads exported graph records into a Gremlin database
#[derive(Clone)]
pub struct GraphLoader {
    client: Arc<dyn GremlinClient>,
}

impl GraphLoader {
    pub fn new(client: Arc<dyn GremlinClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn GremlinClient> {
        &self.client
    }

    /// Drop every vertex (and with them every edge)
    pub async fn clear_graph(&self) -> LoaderResult<()> {
        tracing::info!("Clearing existing graph...");
        self.client
            .submit("g.V().drop()", Default::default())
            .await
            .map_err(|e| {
                tracing::error!("Error clearing graph: {}", e);
                e
            })?;
        tracing::info!("✅ Graph cleared successfully");
        Ok(())
    }

    pub async fn load_nodes(&self, nodes: &[GraphNode]) -> LoaderResult<usize> {
        tracing::info!("🔷 Processing {} nodes...", nodes.len());
        process_in_batches(nodes, BATCH_SIZE_NODES, "nodes", |batch| async move {
            for node in batch {
                self.add_node(node).await?;
            }
            Ok::<(), LoaderError>(())
        })
        .await?;
        Ok(nodes.len())
    }

    pub async fn load_edges(&self, edges: &[GraphEdge]) -> LoaderResult<usize> {
        tracing::info!("🔷 Processing {} edges...", edges.len());
        process_in_batches(edges, BATCH_SIZE_EDGES, "edges", |batch| async move {
            for edge in batch {
                self.add_edge(edge).await?;
            }
            Ok::<(), LoaderError>(())
        })
        .await?;
        Ok(edges.len())
    }

    /// Nodes first, then edges, so edge endpoints resolve
    pub async fn load_export(&self, export: &GraphExport) -> LoaderResult<LoadSummary> {
        let nodes = self.load_nodes(&export.nodes).await?;
        let edges = self.load_edges(&export.edges).await?;
        tracing::info!("✅ Graph data loaded successfully");
        Ok(LoadSummary { nodes, edges })
    }

    /// Load `graph_nodes.json` and `graph_edges.json` from a directory.
    /// A missing file skips that half of the load.
    pub async fn load_from_dir(&self, context_dir: &Path) -> LoaderResult<LoadSummary> {
        let mut summary = LoadSummary::default();

        if let Some(nodes) = read_records::<GraphNode>(&context_dir.join(NODES_FILE)).await? {
            summary.nodes = self.load_nodes(&nodes).await?;
        }
        if let Some(edges) = read_records::<GraphEdge>(&context_dir.join(EDGES_FILE)).await? {
            summary.edges = self.load_edges(&edges).await?;
        }

        tracing::info!(
            "✅ Graph data loaded from {} ({} nodes, {} edges)",
            context_dir.display(),
            summary.nodes,
            summary.edges
        );
        Ok(summary)
    }

    /// Clear the database and load the directory's records
    pub async fn init_graph(&self, context_dir: &Path) -> LoaderResult<LoadSummary> {
        self.clear_graph().await?;
        let summary = self.load_from_dir(context_dir).await?;
        tracing::info!("✅ Graph initialized successfully");
        Ok(summary)
    }

    async fn add_node(&self, node: &GraphNode) -> LoaderResult<()> {
        let params = bindings(json!({
            "node_id": node.id,
            "entity_type": node.entity_type,
            "description": node.description,
            "source_id": node.source_id.clone().unwrap_or_default(),
        }));
        self.client.submit(ADD_NODE_QUERY, params).await?;
        Ok(())
    }

    async fn add_edge(&self, edge: &GraphEdge) -> LoaderResult<()> {
        let params = bindings(json!({
            "source_name": edge.source,
            "target_name": edge.target,
            "rel_type": edge.relationship_type(),
            "weight": edge.weight_or_default(),
            "description": edge.description,
            "keywords": edge.keywords,
            "source_id": edge.source_id.clone().unwrap_or_default(),
        }));
        self.client.submit(ADD_EDGE_QUERY, params).await?;
        Ok(())
    }
}

/// Run `process` over consecutive slices of `items`. The first failing
/// batch stops the run; earlier batches stay committed.
async fn process_in_batches<'a, T, F, Fut>(
    items: &'a [T],
    batch_size: usize,
    kind: &str,
    mut process: F,
) -> LoaderResult<()>
where
    F: FnMut(&'a [T]) -> Fut,
    Fut: Future<Output = LoaderResult<()>>,
{
    for (index, batch) in items.chunks(batch_size).enumerate() {
        if let Err(e) = process(batch).await {
            tracing::error!("Error processing {} batch {}: {}", kind, index + 1, e);
            return Err(e);
        }
        tracing::info!("Processed batch {}", index + 1);
    }
    Ok(())
}

async fn read_records<T: DeserializeOwned>(path: &Path) -> LoaderResult<Option<Vec<T>>> {
    if !tokio::fs::try_exists(path).await? {
        tracing::warn!("⚠️ {} not found, skipping", path.display());
        return Ok(None);
    }
    let raw = tokio::fs::read(path).await?;
    Ok(Some(serde_json::from_slice(&raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_query_binds_every_value() {
        for name in ["source_name", "target_name", "rel_type", "weight", "description", "keywords", "source_id"] {
            assert!(ADD_EDGE_QUERY.contains(name), "missing binding {}", name);
        }
        assert!(!ADD_EDGE_QUERY.contains('"'));
    }

    #[test]
    fn test_node_query_sets_display_name() {
        assert!(ADD_NODE_QUERY.contains(".property('displayName', node_id)"));
        assert!(ADD_NODE_QUERY.starts_with("g.addV('entity')"));
    }

    #[tokio::test]
    async fn test_process_in_batches_sizes() {
        let items: Vec<u32> = (0..1201).collect();
        let mut sizes = Vec::new();
        process_in_batches(&items, 500, "nodes", |batch| {
            sizes.push(batch.len());
            async { Ok::<(), LoaderError>(()) }
        })
        .await
        .unwrap();
        assert_eq!(sizes, vec![500, 500, 201]);
    }
}
