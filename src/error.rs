//! Error types for Courier.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Template sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Configuration-related errors (startup / environment).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Outbound dispatch errors.
///
/// Provider-level send failures are NOT errors here — they come back as a
/// persisted message with `status = failed`. Only request-shape and
/// persistence problems surface as `Err`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid send request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported channel: {0}")]
    UnsupportedChannel(String),

    #[error("Failed to persist message: {0}")]
    Persistence(#[from] DatabaseError),
}

/// Template reconciliation errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("WhatsApp configuration missing for tenant {tenant_id}")]
    ConfigurationMissing { tenant_id: String },

    #[error("WhatsApp access token missing for tenant {tenant_id}")]
    CredentialMissing { tenant_id: String },

    #[error("WhatsApp business account id (waba_id) missing for tenant {tenant_id}")]
    RoutingIdMissing { tenant_id: String },

    #[error("Template catalog request failed: {body}")]
    Provider { body: String },

    #[error("Template upsert failed after {synced} rows: {source}")]
    Persistence {
        /// Rows committed before the failing batch.
        synced: usize,
        /// Whether any batch succeeded via the downgraded (old-schema) path.
        downgraded: bool,
        source: DatabaseError,
    },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
