//! Error types for the health board client and dashboard

use std::fmt;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug)]
pub enum DashboardError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Template rendering failed
    Template(askama::Error),

    /// Configuration error
    Config(String),

    /// The board answered with a non-success status
    Status { code: u16, message: String },

    /// Input rejected before it was sent to the board
    Validation(String),

    /// Update carried no fields, nothing was sent
    NoChanges,

    /// Generic error with message
    Other(String),
}

impl DashboardError {
    /// HTTP status code, when the error came from a board response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DashboardError::Status { code, .. } => Some(*code),
            DashboardError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Io(err) => write!(f, "IO error: {}", err),
            DashboardError::Http(err) => write!(f, "HTTP error: {}", err),
            DashboardError::Json(err) => write!(f, "JSON error: {}", err),
            DashboardError::Template(err) => write!(f, "Template error: {}", err),
            DashboardError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DashboardError::Status { code, message } => {
                write!(f, "Board returned {}: {}", code, message)
            }
            DashboardError::Validation(msg) => write!(f, "Validation error: {}", msg),
            DashboardError::NoChanges => write!(f, "No update parameters provided"),
            DashboardError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DashboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashboardError::Io(err) => Some(err),
            DashboardError::Http(err) => Some(err),
            DashboardError::Json(err) => Some(err),
            DashboardError::Template(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Io(err)
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Http(err)
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Json(err)
    }
}

impl From<askama::Error> for DashboardError {
    fn from(err: askama::Error) -> Self {
        DashboardError::Template(err)
    }
}
