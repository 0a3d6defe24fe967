//! Shared data model for the ctxrag services.
//!
//! Everything that crosses a crate boundary or goes over the wire lives here:
//! context metadata, prompt sets, query/insert payloads and the graph records
//! exchanged between the GraphML export and the graph loader.

pub mod context;
pub mod graph;
pub mod prompts;
pub mod rag;

pub use context::*;
pub use graph::*;
pub use prompts::*;
pub use rag::*;
