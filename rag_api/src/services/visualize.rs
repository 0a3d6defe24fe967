use rand::Rng;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;

use ctxrag_graph_loader::{parse_graphml, GRAPHML_FILE};
use ctxrag_models::GraphExport;

use crate::errors::{ApiError, ApiResult};

pub const VISUALIZATION_FILE: &str = "knowledge_graph.html";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Knowledge Graph</title>
<script src="https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"></script>
<style>
  html, body { margin: 0; padding: 0; }
  #graph { width: 100%; height: 100vh; border: 1px solid lightgray; }
</style>
</head>
<body>
<div id="graph"></div>
<script>
  var nodes = new vis.DataSet(__NODES__);
  var edges = new vis.DataSet(__EDGES__);
  var network = new vis.Network(
    document.getElementById("graph"),
    { nodes: nodes, edges: edges },
    { physics: { stabilization: true }, edges: { smooth: false } }
  );
</script>
</body>
</html>
"#;

/// Path of the context's graph page, rendering it first when missing or
/// when `regenerate` is set
pub async fn visualization_path(context_dir: &Path, regenerate: bool) -> ApiResult<PathBuf> {
    let page = context_dir.join(VISUALIZATION_FILE);
    if !regenerate && fs::try_exists(&page).await? {
        return Ok(page);
    }

    let graph_file = context_dir.join(GRAPHML_FILE);
    if !fs::try_exists(&graph_file).await? {
        return Err(ApiError::NotFound(
            "No graph data available. Please upload content first.".to_string(),
        ));
    }

    let graph = parse_graphml(&fs::read_to_string(&graph_file).await?)?;
    fs::write(&page, render_html(&graph)?).await?;

    tracing::info!(
        "🕸️ Rendered {} nodes and {} edges into {}",
        graph.nodes.len(),
        graph.edges.len(),
        page.display()
    );
    Ok(page)
}

/// Self-contained vis-network page with a random colour per node
pub fn render_html(graph: &GraphExport) -> ApiResult<String> {
    let mut rng = rand::thread_rng();

    let nodes: Vec<_> = graph
        .nodes
        .iter()
        .map(|node| {
            json!({
                "id": node.id,
                "label": node.id,
                "title": node.description,
                "group": node.entity_type,
                "color": format!("#{:06x}", rng.gen_range(0..=0xFFFFFFu32)),
            })
        })
        .collect();

    let edges: Vec<_> = graph
        .edges
        .iter()
        .map(|edge| {
            json!({
                "from": edge.source,
                "to": edge.target,
                "title": edge.description,
                "label": edge.relationship_type(),
                "value": edge.weight_or_default(),
            })
        })
        .collect();

    Ok(PAGE_TEMPLATE
        .replace("__NODES__", &script_json(&nodes)?)
        .replace("__EDGES__", &script_json(&edges)?))
}

/// JSON safe to inline in a `<script>` element
fn script_json<T: serde::Serialize>(value: &T) -> ApiResult<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxrag_models::{GraphEdge, GraphNode};

    fn graph() -> GraphExport {
        GraphExport {
            nodes: vec![GraphNode {
                id: "SCROOGE".into(),
                entity_type: "PERSON".into(),
                description: "</script><b>miser</b>".into(),
                source_id: None,
            }],
            edges: vec![GraphEdge {
                source: "SCROOGE".into(),
                target: "SCROOGE".into(),
                description: "self".into(),
                keywords: "uses".into(),
                weight: None,
                source_id: None,
            }],
        }
    }

    #[test]
    fn test_render_escapes_script_end() {
        let html = render_html(&graph()).unwrap();
        assert!(html.contains("SCROOGE"));
        assert!(html.contains("<\\/script>"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[tokio::test]
    async fn test_missing_graph_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = visualization_path(dir.path(), false).await;
        match result {
            Err(ApiError::NotFound(msg)) => {
                assert_eq!(msg, "No graph data available. Please upload content first.")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cached_page_is_served_unless_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(VISUALIZATION_FILE), "cached").unwrap();

        let path = visualization_path(dir.path(), false).await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "cached");

        assert!(matches!(
            visualization_path(dir.path(), true).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
