pub mod client;
pub mod graphson;

pub use client::{bindings, Bindings, GremlinClient, HttpGremlinClient};
pub use graphson::simplify;
