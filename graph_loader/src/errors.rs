use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Gremlin error: {0}")]
    Gremlin(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GraphML error: {0}")]
    GraphMl(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    NotFound(String),
}

impl From<quick_xml::Error> for LoaderError {
    fn from(e: quick_xml::Error) -> Self {
        LoaderError::GraphMl(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for LoaderError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        LoaderError::GraphMl(e.to_string())
    }
}

pub type LoaderResult<T> = Result<T, LoaderError>;
