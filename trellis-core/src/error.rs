//! Error types for registry operations.
//!
//! Every failure is raised synchronously at the call site that violated an
//! invariant. Nothing is retried and nothing is recovered internally.

use thiserror::Error;

/// Errors returned by cell construction and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The cell name is empty or consists only of whitespace.
    #[error("cell name {name:?} is empty or whitespace")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A cell with the same name is already registered.
    #[error("a cell named {name:?} is already registered")]
    NameConflict {
        /// The conflicting name.
        name: String,
    },

    /// A dependency was referenced by a name that no registered cell has.
    #[error("dependency {name:?} does not name a registered cell")]
    InvalidDependency {
        /// The unresolved name.
        name: String,
    },

    /// A dependency cell belongs to a different registry.
    #[error("dependency {name:?} is not registered in this registry")]
    ForeignDependency {
        /// Name of the foreign cell.
        name: String,
    },

    /// `batch_update` was called while a batch was already running.
    #[error("a batch update is already in progress")]
    BatchInProgress,
}

/// Result alias for registry operations.
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_cell() {
        let err = RegistryError::NameConflict { name: "Total".into() };
        assert_eq!(err.to_string(), "a cell named \"Total\" is already registered");

        let err = RegistryError::BatchInProgress;
        assert_eq!(err.to_string(), "a batch update is already in progress");
    }
}
