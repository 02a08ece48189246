//! Error types for the rasterizer and the image-generation client

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for svgshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rasterizing or generating images
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to start the rendering engine
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load the host document
    #[error("Failed to load document: {0}")]
    LoadError(String),

    /// Failed to render or capture content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Input rejected before any work was attempted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input path does not exist
    #[error("Path does not exist: '{}'", .0.display())]
    NotFound(PathBuf),

    /// Filesystem failure tied to a specific path
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The image-generation service rejected the request
    #[error("API call failed: {code} - {message}")]
    Api { code: String, message: String },

    /// The image-generation service answered without an image
    #[error("No image returned by the service")]
    EmptyResponse,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

#[cfg(feature = "imagegen")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::NetworkError(format!("request timed out: {}", err))
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = Error::io("slides/a.svg", std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let msg = err.to_string();
        assert!(msg.contains("slides/a.svg"), "{}", msg);
        assert!(msg.contains("gone"), "{}", msg);
    }

    #[test]
    fn api_error_shows_code_and_message() {
        let err = Error::Api { code: "InvalidApiKey".into(), message: "bad key".into() };
        assert_eq!(err.to_string(), "API call failed: InvalidApiKey - bad key");
    }
}
