use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::errors::LoaderResult;
use crate::gremlin::{bindings, GremlinClient};

const VERTEX_PROJECTION: &str = "project('id', 'label', 'properties').by(id()).by(label()).by(valueMap())";

const EDGE_PROJECTION: &str = "project('id', 'label', 'source', 'target', 'properties')\
    .by(id()).by(label()).by(outV().id()).by(inV().id()).by(valueMap())";

/// Projected vertices and edges, as returned by the graph database
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Subgraph {
    pub nodes: Vec<Value>,
    pub edges: Vec<Value>,
}

/// Every vertex and edge in the database
pub async fn get_graph_data(client: &dyn GremlinClient) -> LoaderResult<Subgraph> {
    let nodes = client
        .submit(&format!("g.V().{}", VERTEX_PROJECTION), Default::default())
        .await?;
    let edges = client
        .submit(&format!("g.E().{}", EDGE_PROJECTION), Default::default())
        .await?;

    tracing::debug!("Fetched graph: {} vertices, {} edges", nodes.len(), edges.len());
    Ok(Subgraph { nodes, edges })
}

/// Entity plus its neighbourhood up to `depth` hops.
///
/// Paths come back as vertex lists; the edge between each consecutive pair
/// is fetched with its own query. Nodes and edges are de-duplicated.
pub async fn get_entity_neighbors(
    client: &dyn GremlinClient,
    entity: &str,
    depth: u32,
) -> LoaderResult<Subgraph> {
    let query = format!(
        "g.V().has('entity', 'id', entity_name).repeat(both().simplePath()).times(depth).path().by({})",
        VERTEX_PROJECTION
    );
    let paths = client
        .submit(&query, bindings(json!({"entity_name": entity, "depth": depth})))
        .await
        .map_err(|e| {
            tracing::error!("Error getting entity neighbors: {}", e);
            e
        })?;

    let edge_query = format!(
        "g.V(from_id).bothE().where(otherV().hasId(to_id)).{}",
        EDGE_PROJECTION
    );

    let mut subgraph = Subgraph::default();
    let mut seen_nodes = HashSet::new();
    let mut seen_edges = HashSet::new();

    for path in paths {
        let Value::Array(vertices) = path else {
            continue;
        };

        for pair in vertices.windows(2) {
            for vertex in pair {
                push_unique(&mut subgraph.nodes, &mut seen_nodes, vertex.clone());
            }

            let params = bindings(json!({
                "from_id": pair[0].get("id").cloned().unwrap_or(Value::Null),
                "to_id": pair[1].get("id").cloned().unwrap_or(Value::Null),
            }));
            match client.submit(&edge_query, params).await?.into_iter().next() {
                Some(edge) => push_unique(&mut subgraph.edges, &mut seen_edges, edge),
                None => tracing::debug!("No edge between consecutive path vertices"),
            }
        }
    }

    tracing::info!(
        "🔷 Neighbors of {} (depth {}): {} nodes, {} edges",
        entity,
        depth,
        subgraph.nodes.len(),
        subgraph.edges.len()
    );
    Ok(subgraph)
}

fn push_unique(items: &mut Vec<Value>, seen: &mut HashSet<String>, item: Value) {
    if seen.insert(item.to_string()) {
        items.push(item);
    }
}
