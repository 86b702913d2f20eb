//! Fire-and-forget transactions.

use crate::error::{CoreError, CoreResult};
use crate::transaction::state::{ProtoTransaction, TransactionState};
use crate::transaction::Transaction;
use std::fmt;
use tracing::debug;

/// A zero-argument staged action.
pub type Action = Box<dyn FnMut() -> CoreResult<()>>;

/// A transaction whose operations are plain actions.
///
/// Commit runs the actions in staging order. Simple transactions can never
/// be rolled back.
pub struct SimpleTransaction {
    proto: ProtoTransaction<Action>,
}

impl SimpleTransaction {
    /// Begins a new simple transaction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            proto: ProtoTransaction::new(false),
        }
    }

    /// Stages a closure as an action.
    pub fn stage<F>(&mut self, action: F) -> CoreResult<()>
    where
        F: FnMut() -> CoreResult<()> + 'static,
    {
        self.proto.add_operation(Box::new(action))
    }

    /// Returns the number of staged actions.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.proto.operation_count()
    }
}

impl Default for SimpleTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction for SimpleTransaction {
    type Operation = Action;
    type Output = ();

    fn state(&self) -> TransactionState {
        self.proto.state()
    }

    fn supports_rollback(&self) -> bool {
        false
    }

    fn add_operation(&mut self, operation: Action) -> CoreResult<()> {
        self.proto.add_operation(operation)
    }

    fn commit(&mut self) -> CoreResult<()> {
        self.proto.begin_commit()?;
        debug!(actions = self.proto.operation_count(), "committing simple transaction");
        for action in self.proto.operations_mut() {
            action()?;
        }
        Ok(())
    }

    fn abort(&mut self) -> CoreResult<()> {
        self.proto.abort()?;
        debug!("aborted simple transaction");
        Ok(())
    }

    fn rollback(&mut self) -> CoreResult<()> {
        Err(CoreError::illegal_operation(
            "simple transactions cannot be rolled back",
        ))
    }
}

impl fmt::Debug for SimpleTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleTransaction")
            .field("state", &self.proto.state())
            .field("operations", &self.proto.operation_count())
            .finish()
    }
}
