//! Error types and handling for `SlopeFinder`

use thiserror::Error;

/// Main error type for the `SlopeFinder` engine
#[derive(Error, Debug)]
pub enum SlopeFinderError {
    /// Persisting a favorites change to the remote store failed
    #[error("Remote write failed: {message}")]
    RemoteWrite { message: String },

    /// Reading favorites from the remote store failed
    #[error("Remote read failed: {message}")]
    RemoteRead { message: String },

    /// A free-text location could not be resolved to a coordinate
    #[error("Geocoding failed for '{query}': {message}")]
    Geocode { query: String, message: String },

    /// A map overlay could not be added or removed
    #[error("Overlay '{id}' error: {message}")]
    Overlay { id: String, message: String },

    /// An action required a signed-in user
    #[error("User not authenticated")]
    NotAuthenticated,

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl SlopeFinderError {
    /// Create a new remote write error
    pub fn remote_write<S: Into<String>>(message: S) -> Self {
        Self::RemoteWrite {
            message: message.into(),
        }
    }

    /// Create a new remote read error
    pub fn remote_read<S: Into<String>>(message: S) -> Self {
        Self::RemoteRead {
            message: message.into(),
        }
    }

    /// Create a new geocoding error
    pub fn geocode<Q: Into<String>, S: Into<String>>(query: Q, message: S) -> Self {
        Self::Geocode {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Create a new overlay error
    pub fn overlay<I: Into<String>, S: Into<String>>(id: I, message: S) -> Self {
        Self::Overlay {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SlopeFinderError::RemoteWrite { .. } => "Failed to update favorite".to_string(),
            SlopeFinderError::RemoteRead { .. } => "Failed to load favorites".to_string(),
            SlopeFinderError::Geocode { query, .. } => {
                format!("Couldn't find a location matching \"{query}\"")
            }
            SlopeFinderError::Overlay { .. } => "Map overlay could not be drawn.".to_string(),
            SlopeFinderError::NotAuthenticated => "User not authenticated".to_string(),
            SlopeFinderError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            SlopeFinderError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            SlopeFinderError::Json { .. } => "Received malformed data.".to_string(),
        }
    }
}
