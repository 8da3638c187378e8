use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::graph::NodeId;

/// Convenient result alias for the stepfree library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The map data source could not be reached or returned no usable area.
    #[error("map data unavailable: {reason}")]
    DataUnavailable { reason: String },

    /// Raised when snapping against a graph without any nodes.
    #[error("walk graph has no nodes to snap to")]
    EmptyGraph,

    /// Raised when the destination cannot be reached from the origin.
    #[error("no path between node {origin} and node {destination}")]
    NoPath {
        origin: NodeId,
        destination: NodeId,
    },

    /// Raised for malformed coordinates, radii, speeds, or source records.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for JSON decoding errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for CSV parsing errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Error::DataUnavailable {
            reason: reason.into(),
        }
    }

    /// Classify this error into the user-facing failure taxonomy.
    pub fn failure(&self) -> RouteFailure {
        match self {
            Error::DataUnavailable { reason } => RouteFailure::DataUnavailable {
                reason: reason.clone(),
            },
            Error::EmptyGraph => RouteFailure::EmptyGraph,
            Error::NoPath { .. } => RouteFailure::NoPath,
            Error::InvalidInput { message } => RouteFailure::InvalidInput {
                message: message.clone(),
            },
            Error::Io(err) => RouteFailure::DataUnavailable {
                reason: err.to_string(),
            },
            Error::Http(err) => RouteFailure::DataUnavailable {
                reason: err.to_string(),
            },
            Error::Json(err) => RouteFailure::DataUnavailable {
                reason: format!("malformed map data: {err}"),
            },
            Error::Csv(err) => RouteFailure::InvalidInput {
                message: err.to_string(),
            },
        }
    }
}

/// Reason a route could not be produced.
///
/// Unlike [`Error`], this type is cheap to clone and serializable so it can be
/// stored inside cached [`RouteResult`](crate::RouteResult) values and shown to
/// end users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteFailure {
    DataUnavailable { reason: String },
    EmptyGraph,
    NoPath,
    InvalidInput { message: String },
}

impl RouteFailure {
    /// Whether the failure depends only on the request and map data, so the
    /// same request would fail the same way again.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, RouteFailure::NoPath | RouteFailure::EmptyGraph)
    }
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteFailure::DataUnavailable { reason } => {
                write!(f, "map data unavailable: {reason}")
            }
            RouteFailure::EmptyGraph => f.write_str("no walkable network near the origin"),
            RouteFailure::NoPath => f.write_str("no route found within the search radius"),
            RouteFailure::InvalidInput { message } => write!(f, "invalid input: {message}"),
        }
    }
}
