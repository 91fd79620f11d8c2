//! Unified error type for medcord.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

/// Unified error type covering all failure modes in medcord.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request data failed validation before any processing started.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The uploaded source could not be decoded or opened.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Producing one variant failed.
    #[error("Transform error [{tag}]: {message}")]
    Transform {
        /// Tag of the variant that failed.
        tag: String,
        /// Human-readable error description.
        message: String,
    },

    /// A `Range` header did not match `bytes=<start>-[<end>]`.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "image", "video group").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::NotFound { .. } => 404,
            Error::InvalidRange(_) => 416,
            Error::Decode(_) | Error::Transform { .. } => 422,
            Error::Database { .. }
            | Error::Io { .. }
            | Error::Tool { .. }
            | Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database { source: err.into() }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Transform`].
    pub fn transform(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transform {
            tag: tag.into(),
            message: message.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
