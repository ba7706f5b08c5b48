//! Error types for broker operations

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in broker operations
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A referenced entity does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// A membership, capacity, or uniqueness rule was violated
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// One or more directly-requested artifacts failed to write
    #[error(transparent)]
    Materialization(#[from] MaterializationError),

    /// The external compile step reported errors
    #[error("Compile failed: {failed} of {total} templates failed: {detail}")]
    Compile {
        compiled: usize,
        failed: usize,
        total: usize,
        detail: String,
    },

    /// Lock registry fault (not contention - contention blocks)
    ///
    /// The in-process registry cannot fault; this variant is reserved for
    /// registries backed by an external coordinator.
    #[error("Lock registry error: {0}")]
    Lock(String),

    /// Location tree error
    #[error("Location error: {0}")]
    Location(#[from] crate::domain::LocationError),

    /// Filesystem error outside the stash/write scope
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Aggregated hard write failures for one materialization batch
///
/// Every hard failure encountered during the batch is recorded, not just
/// the first, since a rollback means the whole batch must be retried
/// together.
#[derive(Debug, Error)]
#[error("{} hard write failure(s): {}", failures.len(), summary(failures))]
pub struct MaterializationError {
    /// All hard failures encountered in the batch
    pub failures: Vec<WriteFailure>,
}

/// A single failed artifact write
#[derive(Debug, Clone)]
pub struct WriteFailure {
    /// Label of the entity owning the failed artifact
    pub entity: String,
    /// Target path that could not be written
    pub path: PathBuf,
    /// Underlying error text
    pub detail: String,
}

fn summary(failures: &[WriteFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.entity, f.path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

impl BrokerError {
    /// Shorthand for a not-found error
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        BrokerError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialization_error_lists_every_failure() {
        let err = MaterializationError {
            failures: vec![
                WriteFailure {
                    entity: "host/web01".to_string(),
                    path: PathBuf::from("hosts/web01.tpl"),
                    detail: "permission denied".to_string(),
                },
                WriteFailure {
                    entity: "host/web02".to_string(),
                    path: PathBuf::from("hosts/web02.tpl"),
                    detail: "disk full".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("2 hard write failure(s)"));
        assert!(msg.contains("host/web01"));
        assert!(msg.contains("host/web02"));
    }

    #[test]
    fn test_not_found_display() {
        let err = BrokerError::not_found("service", "dns");
        assert_eq!(err.to_string(), "service 'dns' not found");
    }
}
