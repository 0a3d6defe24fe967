use serde::{Deserialize, Serialize};

/// Label used when no keyword rule or token yields a relationship type
pub const DEFAULT_RELATIONSHIP: &str = "relates_to";

/// Keyword substring → relationship label, first match wins
const RELATIONSHIP_RULES: [(&str, &str); 5] = [
    ("lead", "leads"),
    ("participate", "participates"),
    ("uses", "uses"),
    ("located", "located_in"),
    ("occurs", "occurs_in"),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub source_id: Option<String>,
}

impl GraphEdge {
    pub fn weight_or_default(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }

    pub fn relationship_type(&self) -> String {
        infer_relationship_type(&self.keywords)
    }
}

/// Derive an edge label from a free-text keyword string.
///
/// Substring rules are checked in order against the lower-cased keywords;
/// otherwise the first comma-separated token (quotes stripped, trimmed,
/// lower-cased) is used, and `relates_to` when that token is empty.
pub fn infer_relationship_type(keywords: &str) -> String {
    let lowered = keywords.to_lowercase();
    for (needle, label) in RELATIONSHIP_RULES {
        if lowered.contains(needle) {
            return label.to_string();
        }
    }

    let first = keywords
        .replace('"', "")
        .split(',')
        .next()
        .map(|token| token.trim().to_lowercase())
        .unwrap_or_default();

    if first.is_empty() {
        DEFAULT_RELATIONSHIP.to_string()
    } else {
        first
    }
}

/// Nodes and edges exported from a knowledge graph
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphExport {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
