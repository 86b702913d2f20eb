//! Transaction state.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransactionState {
    /// Operations can still be staged.
    UnderConstruction,
    /// The transaction has been committed.
    Committed,
    /// The transaction has been aborted.
    Aborted,
    /// A committed transaction has been rolled back.
    RolledBack,
}

impl TransactionState {
    /// Returns true if no further transition is possible from this state.
    ///
    /// `Committed` is not terminal: a rollback may still follow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted | Self::RolledBack)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnderConstruction => "under construction",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
            Self::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Lifecycle shared by every transaction kind.
///
/// A `ProtoTransaction` owns the staged operations and enforces the state
/// machine; it does not know how to execute its operations. Concrete kinds
/// call [`begin_commit`](Self::begin_commit) or
/// [`begin_rollback`](Self::begin_rollback) first and then walk the
/// operations themselves.
///
/// Transitions:
/// - `UnderConstruction` -> `UnderConstruction` via [`add_operation`](Self::add_operation)
/// - `UnderConstruction` -> `Committed` via [`begin_commit`](Self::begin_commit)
/// - `UnderConstruction` -> `Aborted` via [`abort`](Self::abort)
/// - `Committed` -> `RolledBack` via [`begin_rollback`](Self::begin_rollback),
///   only if rollback is supported
#[derive(Debug)]
pub struct ProtoTransaction<O> {
    /// Current state.
    state: TransactionState,
    /// Staged operations in staging order.
    operations: Vec<O>,
    /// Whether `Committed` -> `RolledBack` is allowed.
    rollback_supported: bool,
}

impl<O> ProtoTransaction<O> {
    /// Creates a transaction under construction with no staged operations.
    #[must_use]
    pub fn new(rollback_supported: bool) -> Self {
        Self {
            state: TransactionState::UnderConstruction,
            operations: Vec::new(),
            rollback_supported,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns whether this transaction can be rolled back after commit.
    #[must_use]
    pub fn supports_rollback(&self) -> bool {
        self.rollback_supported
    }

    /// Returns the staged operations in staging order.
    #[must_use]
    pub fn operations(&self) -> &[O] {
        &self.operations
    }

    /// Returns the staged operations for execution.
    pub fn operations_mut(&mut self) -> &mut [O] {
        &mut self.operations
    }

    /// Returns the number of staged operations.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Stages an operation.
    pub fn add_operation(&mut self, operation: O) -> CoreResult<()> {
        self.ensure_under_construction()?;
        self.operations.push(operation);
        Ok(())
    }

    /// Aborts the transaction, discarding all staged operations.
    pub fn abort(&mut self) -> CoreResult<()> {
        self.ensure_under_construction()?;
        self.operations.clear();
        self.state = TransactionState::Aborted;
        Ok(())
    }

    /// Moves the transaction to `Committed`.
    ///
    /// The transition happens before any staged work runs, so a commit whose
    /// execution fails still leaves the transaction committed.
    pub fn begin_commit(&mut self) -> CoreResult<()> {
        self.ensure_under_construction()?;
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Moves the transaction from `Committed` to `RolledBack`.
    pub fn begin_rollback(&mut self) -> CoreResult<()> {
        if !self.rollback_supported {
            return Err(CoreError::illegal_operation(
                "transaction does not support rollback",
            ));
        }
        if self.state != TransactionState::Committed {
            return Err(CoreError::illegal_operation(format!(
                "cannot roll back a transaction that is {}",
                self.state
            )));
        }
        self.state = TransactionState::RolledBack;
        Ok(())
    }

    /// Ensures operations can still be staged.
    fn ensure_under_construction(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::UnderConstruction => Ok(()),
            TransactionState::Committed => Err(CoreError::illegal_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(CoreError::illegal_operation("transaction already aborted"))
            }
            TransactionState::RolledBack => Err(CoreError::illegal_operation(
                "transaction already rolled back",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_txn() -> ProtoTransaction<u32> {
        ProtoTransaction::new(true)
    }

    #[test]
    fn new_transaction_is_under_construction() {
        let txn = create_txn();
        assert_eq!(txn.state(), TransactionState::UnderConstruction);
        assert_eq!(txn.operation_count(), 0);
        assert!(txn.supports_rollback());
    }

    #[test]
    fn add_operation_appends_in_order() {
        let mut txn = create_txn();
        txn.add_operation(1).unwrap();
        txn.add_operation(2).unwrap();
        assert_eq!(txn.operations(), &[1, 2]);
    }

    #[test]
    fn abort_clears_operations() {
        let mut txn = create_txn();
        txn.add_operation(1).unwrap();
        txn.abort().unwrap();

        assert_eq!(txn.state(), TransactionState::Aborted);
        assert_eq!(txn.operation_count(), 0);
    }

    #[test]
    fn cannot_add_after_commit() {
        let mut txn = create_txn();
        txn.begin_commit().unwrap();

        let err = txn.add_operation(1).unwrap_err();
        assert!(err.is_illegal_operation());
    }

    #[test]
    fn cannot_add_after_abort() {
        let mut txn = create_txn();
        txn.abort().unwrap();

        assert!(txn.add_operation(1).is_err());
        assert!(txn.abort().is_err());
        assert!(txn.begin_commit().is_err());
    }

    #[test]
    fn cannot_commit_twice() {
        let mut txn = create_txn();
        txn.begin_commit().unwrap();
        assert!(txn.begin_commit().unwrap_err().is_illegal_operation());
    }

    #[test]
    fn rollback_requires_commit() {
        let mut txn = create_txn();
        assert!(txn.begin_rollback().is_err());

        txn.begin_commit().unwrap();
        txn.begin_rollback().unwrap();
        assert_eq!(txn.state(), TransactionState::RolledBack);

        // Rolled back is terminal.
        assert!(txn.begin_rollback().is_err());
        assert!(txn.add_operation(1).is_err());
    }

    #[test]
    fn rollback_requires_support() {
        let mut txn: ProtoTransaction<u32> = ProtoTransaction::new(false);
        txn.begin_commit().unwrap();

        let err = txn.begin_rollback().unwrap_err();
        assert!(err.to_string().contains("does not support rollback"));
        assert_eq!(txn.state(), TransactionState::Committed);
    }

    #[test]
    fn terminal_states() {
        assert!(!TransactionState::UnderConstruction.is_terminal());
        assert!(!TransactionState::Committed.is_terminal());
        assert!(TransactionState::Aborted.is_terminal());
        assert!(TransactionState::RolledBack.is_terminal());
    }
}
