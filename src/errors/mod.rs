//! Error handling module for the feed store.
//!
//! Provides one error type shared by the store, ingestion and persistence layers, with
//! stable error codes for callers that need to branch on the failure kind.

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
    pub const FETCH_ERROR: &str = "FETCH_ERROR";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Result alias used throughout the crate.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Project (or other keyed record) is not present
    NotFound(String),
    /// Feed text could not be turned into a feed document
    Parse(String),
    /// Durable storage failure
    Database(String),
    /// Record could not be encoded or decoded
    Serialization(String),
    /// Network client could not be built or used
    Fetch(String),
    /// Invalid process configuration
    Config(String),
    /// Anything else
    Internal(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Parse(_) => codes::PARSE_ERROR,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Serialization(_) => codes::SERIALIZATION_ERROR,
            AppError::Fetch(_) => codes::FETCH_ERROR,
            AppError::Config(_) => codes::CONFIG_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::Parse(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Serialization(msg) => msg.clone(),
            AppError::Fetch(msg) => msg.clone(),
            AppError::Config(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }

    /// Shorthand for a missing project.
    pub fn project_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("Project {} not found", id))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<roxmltree::Error> for AppError {
    fn from(err: roxmltree::Error) -> Self {
        AppError::Parse(format!("XML parse error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Fetch(format!("HTTP client error: {}", err))
    }
}
