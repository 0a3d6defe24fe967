//! GraphML knowledge-graph export → JSON node/edge records.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

use ctxrag_models::{GraphEdge, GraphExport, GraphNode};

use crate::errors::{LoaderError, LoaderResult};

/// File names written by [`convert_graphml`] and read by the loader
pub const NODES_FILE: &str = "graph_nodes.json";
pub const EDGES_FILE: &str = "graph_edges.json";

/// GraphML file the RAG engine leaves in a context directory
pub const GRAPHML_FILE: &str = "graph_chunk_entity_relation.graphml";

/// Attribute names for the conventional `d0..d6` key ids, used when a file
/// carries no `<key>` declarations
const DEFAULT_KEYS: [(&str, &str); 7] = [
    ("d0", "entity_type"),
    ("d1", "description"),
    ("d2", "source_id"),
    ("d3", "weight"),
    ("d4", "description"),
    ("d5", "keywords"),
    ("d6", "source_id"),
];

enum Element {
    Node { id: String, data: HashMap<String, String> },
    Edge { source: String, target: String, data: HashMap<String, String> },
}

/// Parse a GraphML document into graph records
pub fn parse_graphml(xml: &str) -> LoaderResult<GraphExport> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut keys: HashMap<String, String> = HashMap::new();
    let mut export = GraphExport::default();
    let mut current: Option<Element> = None;
    let mut data_key: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"key" => register_key(&e, &mut keys)?,
                b"node" => {
                    current = Some(Element::Node {
                        id: attr(&e, b"id")?.unwrap_or_default(),
                        data: HashMap::new(),
                    })
                }
                b"edge" => current = Some(open_edge(&e)?),
                b"data" => {
                    data_key = attr(&e, b"key")?;
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"key" => register_key(&e, &mut keys)?,
                b"node" => finish(
                    Element::Node {
                        id: attr(&e, b"id")?.unwrap_or_default(),
                        data: HashMap::new(),
                    },
                    &mut export,
                ),
                b"edge" => finish(open_edge(&e)?, &mut export),
                _ => {}
            },
            Event::Text(t) => {
                if data_key.is_some() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) => {
                if data_key.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"data" => {
                    if let Some(key) = data_key.take() {
                        let name = resolve_key(&keys, &key);
                        match current.as_mut() {
                            Some(Element::Node { data, .. }) | Some(Element::Edge { data, .. }) => {
                                data.insert(name, std::mem::take(&mut text));
                            }
                            None => {}
                        }
                    }
                }
                b"node" | b"edge" => {
                    if let Some(element) = current.take() {
                        finish(element, &mut export);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(export)
}

/// Convert a GraphML file and write the node/edge JSON files into `out_dir`
pub async fn convert_graphml(xml_path: &Path, out_dir: &Path) -> LoaderResult<GraphExport> {
    if !tokio::fs::try_exists(xml_path).await? {
        tracing::error!("File not found - {}", xml_path.display());
        return Err(LoaderError::NotFound(xml_path.display().to_string()));
    }

    let xml = tokio::fs::read_to_string(xml_path).await?;
    let export = parse_graphml(&xml)?;

    tokio::fs::create_dir_all(out_dir).await?;
    tokio::fs::write(out_dir.join(NODES_FILE), serde_json::to_vec_pretty(&export.nodes)?).await?;
    tokio::fs::write(out_dir.join(EDGES_FILE), serde_json::to_vec_pretty(&export.edges)?).await?;

    tracing::info!(
        "✅ Converted {} into {} nodes and {} edges under {}",
        xml_path.display(),
        export.nodes.len(),
        export.edges.len(),
        out_dir.display()
    );
    Ok(export)
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> LoaderResult<Option<String>> {
    for attribute in e.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn register_key(e: &BytesStart<'_>, keys: &mut HashMap<String, String>) -> LoaderResult<()> {
    if let (Some(id), Some(name)) = (attr(e, b"id")?, attr(e, b"attr.name")?) {
        keys.insert(id, name);
    }
    Ok(())
}

fn open_edge(e: &BytesStart<'_>) -> LoaderResult<Element> {
    Ok(Element::Edge {
        source: attr(e, b"source")?.unwrap_or_default(),
        target: attr(e, b"target")?.unwrap_or_default(),
        data: HashMap::new(),
    })
}

fn resolve_key(keys: &HashMap<String, String>, key: &str) -> String {
    if let Some(name) = keys.get(key) {
        return name.clone();
    }
    DEFAULT_KEYS
        .iter()
        .find(|(id, _)| *id == key)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| key.to_string())
}

fn strip_quotes(value: &str) -> String {
    value.trim_matches('"').to_string()
}

fn finish(element: Element, export: &mut GraphExport) {
    match element {
        Element::Node { id, mut data } => export.nodes.push(GraphNode {
            id: strip_quotes(&id),
            entity_type: data.remove("entity_type").map(|v| strip_quotes(&v)).unwrap_or_default(),
            description: data.remove("description").unwrap_or_default(),
            source_id: data.remove("source_id"),
        }),
        Element::Edge { source, target, mut data } => export.edges.push(GraphEdge {
            source: strip_quotes(&source),
            target: strip_quotes(&target),
            description: data.remove("description").unwrap_or_default(),
            keywords: data.remove("keywords").unwrap_or_default(),
            weight: data.remove("weight").and_then(|w| w.trim().parse().ok()),
            source_id: data.remove("source_id"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <key id="d6" for="edge" attr.name="source_id" attr.type="string" />
  <key id="d5" for="edge" attr.name="keywords" attr.type="string" />
  <key id="d4" for="edge" attr.name="description" attr.type="string" />
  <key id="d3" for="edge" attr.name="weight" attr.type="double" />
  <key id="d2" for="node" attr.name="source_id" attr.type="string" />
  <key id="d1" for="node" attr.name="description" attr.type="string" />
  <key id="d0" for="node" attr.name="entity_type" attr.type="string" />
  <graph edgedefault="undirected">
    <node id="&quot;SCROOGE&quot;">
      <data key="d0">"PERSON"</data>
      <data key="d1">A miser &amp; businessman.</data>
      <data key="d2">chunk-1</data>
    </node>
    <node id="&quot;LONDON&quot;">
      <data key="d0">"GEO"</data>
      <data key="d1">A city.</data>
    </node>
    <node id="&quot;ORPHAN&quot;" />
    <edge source="&quot;SCROOGE&quot;" target="&quot;LONDON&quot;">
      <data key="d3">2.5</data>
      <data key="d4">Scrooge lives in London.</data>
      <data key="d5">"located, residence"</data>
      <data key="d6">chunk-1</data>
    </edge>
  </graph>
</graphml>"#;

    #[test]
    fn test_parse_nodes() {
        let export = parse_graphml(SAMPLE).unwrap();
        assert_eq!(export.nodes.len(), 3);

        let scrooge = &export.nodes[0];
        assert_eq!(scrooge.id, "SCROOGE");
        assert_eq!(scrooge.entity_type, "PERSON");
        assert_eq!(scrooge.description, "A miser & businessman.");
        assert_eq!(scrooge.source_id.as_deref(), Some("chunk-1"));

        assert_eq!(export.nodes[1].source_id, None);
        assert_eq!(export.nodes[2].id, "ORPHAN");
    }

    #[test]
    fn test_parse_edges() {
        let export = parse_graphml(SAMPLE).unwrap();
        assert_eq!(export.edges.len(), 1);

        let edge = &export.edges[0];
        assert_eq!(edge.source, "SCROOGE");
        assert_eq!(edge.target, "LONDON");
        assert_eq!(edge.weight, Some(2.5));
        assert_eq!(edge.description, "Scrooge lives in London.");
        assert_eq!(edge.relationship_type(), "located_in");
    }

    #[test]
    fn test_undeclared_keys_fall_back_to_defaults() {
        let xml = r#"<graphml><graph>
            <node id="A"><data key="d0">ORG</data></node>
            <edge source="A" target="A"><data key="d5">owns</data></edge>
        </graph></graphml>"#;
        let export = parse_graphml(xml).unwrap();
        assert_eq!(export.nodes[0].entity_type, "ORG");
        assert_eq!(export.edges[0].keywords, "owns");
        assert_eq!(export.edges[0].weight, None);
    }

    #[tokio::test]
    async fn test_convert_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let xml_path = dir.path().join(GRAPHML_FILE);
        tokio::fs::write(&xml_path, SAMPLE).await.unwrap();

        let export = convert_graphml(&xml_path, dir.path()).await.unwrap();

        let nodes: Vec<GraphNode> =
            serde_json::from_slice(&std::fs::read(dir.path().join(NODES_FILE)).unwrap()).unwrap();
        let edges: Vec<GraphEdge> =
            serde_json::from_slice(&std::fs::read(dir.path().join(EDGES_FILE)).unwrap()).unwrap();
        assert_eq!(nodes, export.nodes);
        assert_eq!(edges, export.edges);
    }

    #[tokio::test]
    async fn test_convert_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert_graphml(&dir.path().join("missing.graphml"), dir.path()).await;
        assert!(matches!(result, Err(LoaderError::NotFound(_))));
    }
}
