//! Error types for the migration engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Error taxonomy of the migration engine.
///
/// The engine attaches the offending version where one exists and carries
/// the underlying cause verbatim; it never reinterprets store errors.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The store rejected or failed a statement, query, or connection.
    #[error("store error: {0}")]
    Store(String),

    /// A unit with this version is already present in the registry.
    #[error("duplicate migration version: {version}")]
    DuplicateVersion { version: String },

    /// The execution lock could not be acquired within the bounded wait.
    /// Recoverable: re-invoke the runner once the holder has finished.
    #[error("timed out after {waited_ms}ms waiting for migration lock '{name}'")]
    LockTimeout { name: String, waited_ms: u64 },

    /// A rollback target, or an applied version selected for revert, is
    /// not present in the registry.
    #[error("unknown migration version: {version}")]
    UnknownVersion { version: String },

    /// A unit's Up or Down operation failed.
    #[error("migration {version} failed: {source}")]
    MigrationFailed {
        version: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// The ledger already holds a row for this version.
    #[error("migration {version} is already recorded as applied")]
    DuplicateApplication { version: String },

    /// The ledger holds no row for this version.
    #[error("migration {version} is not recorded as applied")]
    NotApplied { version: String },
}

impl MigrateError {
    /// Wrap a unit failure with the version it belongs to.
    pub fn migration_failed(version: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::MigrationFailed {
            version: version.into(),
            source: Box::new(source),
        }
    }
}

impl From<sqlx::Error> for MigrateError {
    fn from(err: sqlx::Error) -> Self {
        MigrateError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_attaches_version_context() {
        let err = MigrateError::migration_failed(
            "20250101000000",
            MigrateError::Store("relation \"tw_workflow\" already exists".to_string()),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("20250101000000"));

        let source = std::error::Error::source(&err).expect("cause is preserved");
        assert!(source.to_string().contains("already exists"));
    }
}
