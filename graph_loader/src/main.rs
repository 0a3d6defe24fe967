use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use ctxrag_config::{load_dotenv, GraphDbConfig};
use ctxrag_graph_loader::{
    convert_graphml, get_entity_neighbors, get_graph_data, GraphLoader, HttpGremlinClient,
    GRAPHML_FILE,
};
use ctxrag_observability::init_tracing_for;

#[derive(Parser, Debug)]
#[command(
    name = "graph-loader",
    version,
    about = "Load a context's knowledge graph into a Gremlin database"
)]
struct Cli {
    /// Graph database host (overrides NEPTUNE_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Graph database port (overrides NEPTUNE_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a GraphML export into graph_nodes.json / graph_edges.json
    Convert {
        /// GraphML file to read
        xml: PathBuf,
        /// Output directory (defaults to the GraphML file's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Load the JSON records in a directory without clearing first
    Load { dir: PathBuf },
    /// Clear the database, then load the JSON records in a directory
    Init { dir: PathBuf },
    /// Drop every vertex and edge
    Clear,
    /// Print an entity's neighbourhood as JSON
    Neighbors {
        entity: String,
        #[arg(short, long, default_value_t = 1)]
        depth: u32,
    },
    /// Print every vertex and edge as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert the working directory's GraphML, clear the database and load it
    Run {
        #[arg(short, long, default_value = "./dickens")]
        working_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    init_tracing_for("graph-loader");

    let cli = Cli::parse();

    let mut db = GraphDbConfig::from_env()?;
    if let Some(endpoint) = cli.endpoint {
        db.endpoint = endpoint;
    }
    if let Some(port) = cli.port {
        db.port = port;
    }

    let loader = || GraphLoader::new(Arc::new(HttpGremlinClient::new(db.gremlin_url())));

    match cli.command {
        Commands::Convert { xml, out_dir } => {
            let out_dir = out_dir
                .or_else(|| xml.parent().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            convert_graphml(&xml, &out_dir)
                .await
                .with_context(|| format!("converting {}", xml.display()))?;
        }
        Commands::Load { dir } => {
            let summary = loader().load_from_dir(&dir).await?;
            tracing::info!("Loaded {} nodes and {} edges", summary.nodes, summary.edges);
        }
        Commands::Init { dir } => {
            loader().init_graph(&dir).await?;
        }
        Commands::Clear => {
            loader().clear_graph().await?;
        }
        Commands::Neighbors { entity, depth } => {
            let loader = loader();
            let subgraph = get_entity_neighbors(loader.client().as_ref(), &entity, depth).await?;
            println!("{}", serde_json::to_string_pretty(&subgraph)?);
        }
        Commands::Export { output } => {
            let loader = loader();
            let graph = get_graph_data(loader.client().as_ref()).await?;
            let json = serde_json::to_string_pretty(&graph)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    tracing::info!("✅ Graph written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Run { working_dir } => {
            convert_graphml(&working_dir.join(GRAPHML_FILE), &working_dir).await?;
            let summary = loader().init_graph(&working_dir).await?;
            tracing::info!(
                "✅ Graph data loaded successfully ({} nodes, {} edges)",
                summary.nodes,
                summary.edges
            );
        }
    }

    Ok(())
}
