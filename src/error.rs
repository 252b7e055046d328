use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Monarch request failed: {0}")]
    MonarchHttp(String),

    #[error("Monarch returned status {status}: {message}")]
    MonarchStatus { status: u16, message: String },

    #[error("similarity search request failed: {0}")]
    SemsimHttp(String),

    #[error("similarity search returned status {status}: {message}")]
    SemsimStatus { status: u16, message: String },

    #[error("Open Library request failed: {0}")]
    OpenLibraryHttp(String),

    #[error("Open Library returned status {status}: {message}")]
    OpenLibraryStatus { status: u16, message: String },

    #[error("PubMed request failed: {0}")]
    PubmedHttp(String),

    #[error("PubMed returned status {status}: {message}")]
    PubmedStatus { status: u16, message: String },

    #[error("publication not found: {0}")]
    PublicationNotFound(String),

    #[error("server error: {0}")]
    Server(String),
}

impl BridgeError {
    /// True when the failure came from the knowledge-graph or similarity
    /// collaborators rather than from the caller's input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            BridgeError::MonarchHttp(_)
                | BridgeError::MonarchStatus { .. }
                | BridgeError::SemsimHttp(_)
                | BridgeError::SemsimStatus { .. }
        )
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidIdentifier(_) | BridgeError::InvalidQuery(_)
        )
    }
}
