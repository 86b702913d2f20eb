//! Error types for mmapp core.

use crate::entity::EntityId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in mmapp core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A transaction was used outside the states its lifecycle allows.
    #[error("illegal transaction operation: {message}")]
    IllegalOperation {
        /// Description of the violated guard.
        message: String,
    },

    /// A cardinality expression could not be parsed.
    #[error("invalid association rule {expression:?}: {message}")]
    InvalidAssociationRule {
        /// The offending expression.
        expression: String,
        /// What is wrong with it.
        message: String,
    },

    /// A cardinality expression names an accessor that was never registered.
    #[error("unknown bound accessor {name:?}")]
    UnknownBoundAccessor {
        /// Name of the missing accessor.
        name: String,
    },

    /// Seed data contains the same id more than once.
    #[error("duplicate id {id} in register seed data")]
    DuplicateId {
        /// The repeated id.
        id: EntityId,
    },

    /// An id lies beyond the register's configured slot limit.
    #[error("id {id} exceeds the register slot limit of {limit}")]
    SlotLimitExceeded {
        /// The rejected id.
        id: EntityId,
        /// The configured limit.
        limit: usize,
    },

    /// No element occupies the given id.
    #[error("entity not found: {id}")]
    EntityNotFound {
        /// The vacant id.
        id: EntityId,
    },

    /// An injected operation or callback failed.
    #[error("operation failed: {message}")]
    OperationFailed {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates an illegal operation error.
    pub fn illegal_operation(message: impl Into<String>) -> Self {
        Self::IllegalOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid association rule error.
    pub fn invalid_rule(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAssociationRule {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown bound accessor error.
    pub fn unknown_accessor(name: impl Into<String>) -> Self {
        Self::UnknownBoundAccessor { name: name.into() }
    }

    /// Creates an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    /// Returns true if this error reports transaction misuse.
    #[must_use]
    pub fn is_illegal_operation(&self) -> bool {
        matches!(self, Self::IllegalOperation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = CoreError::invalid_rule("1..x", "upper bound is not a number");
        assert_eq!(
            err.to_string(),
            "invalid association rule \"1..x\": upper bound is not a number"
        );

        let err = CoreError::unknown_accessor("castSize");
        assert!(err.to_string().contains("castSize"));

        let err = CoreError::DuplicateId {
            id: EntityId::new(7),
        };
        assert_eq!(err.to_string(), "duplicate id #7 in register seed data");
    }

    #[test]
    fn illegal_operation_predicate() {
        assert!(CoreError::illegal_operation("x").is_illegal_operation());
        assert!(!CoreError::operation_failed("x").is_illegal_operation());
    }
}
