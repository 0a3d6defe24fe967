//! Knowledge-graph loader: GraphML conversion, batched Gremlin upload and
//! neighbourhood traversal.

pub mod errors;
pub mod graphml;
pub mod gremlin;
pub mod loader;
pub mod traversal;

pub use errors::{LoaderError, LoaderResult};
pub use graphml::{convert_graphml, parse_graphml, EDGES_FILE, GRAPHML_FILE, NODES_FILE};
pub use gremlin::{GremlinClient, HttpGremlinClient};
pub use loader::{GraphLoader, LoadSummary, BATCH_SIZE_EDGES, BATCH_SIZE_NODES};
pub use traversal::{get_entity_neighbors, get_graph_data, Subgraph};
