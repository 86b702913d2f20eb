//! Transactions that can be rolled back.

use crate::error::CoreResult;
use crate::operation::{Consumer, ReversibleOperation, Supplier, Transformation};
use crate::transaction::state::{ProtoTransaction, TransactionState};
use crate::transaction::Transaction;
use std::fmt;
use tracing::{debug, warn};

/// A transaction threading one value through reversible steps.
///
/// Commit runs:
///
/// ```text
/// obj = begin.forward(())
/// obj = t1.forward(obj) ... obj = tn.forward(obj)
/// end.forward(obj)
/// ```
///
/// and returns `obj`. Rollback walks the exact mirror:
///
/// ```text
/// obj = end.backward(())
/// obj = tn.backward(obj) ... obj = t1.backward(obj)
/// begin.backward(obj)
/// ```
///
/// so every side effect of the begin step, the transformations and the end
/// step is undone in strict reverse order.
///
/// If a step fails during commit the error is returned to the caller and the
/// transaction stays `Committed`; it cannot be retried. Rolling it back then
/// runs the backward walk from the end step, which typically fails because
/// the end step never captured a value.
pub struct ReversibleTransaction<T> {
    proto: ProtoTransaction<Transformation<T>>,
    begin: Supplier<T>,
    end: Consumer<T>,
}

impl<T: Clone + 'static> ReversibleTransaction<T> {
    /// Begins a transaction anchored by `begin` and `end`.
    pub fn new<B, E>(begin: B, end: E) -> Self
    where
        B: ReversibleOperation<(), T> + 'static,
        E: ReversibleOperation<T, ()> + 'static,
    {
        Self {
            proto: ProtoTransaction::new(true),
            begin: Box::new(begin),
            end: Box::new(end),
        }
    }

    /// Stages a transformation.
    pub fn stage<O>(&mut self, operation: O) -> CoreResult<()>
    where
        O: ReversibleOperation<T, T> + 'static,
    {
        self.proto.add_operation(Box::new(operation))
    }

    /// Returns the number of staged transformations.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.proto.operation_count()
    }

    fn run_forward(&mut self) -> CoreResult<T> {
        let mut obj = self.begin.forward(())?;
        for operation in self.proto.operations_mut() {
            obj = operation.forward(obj)?;
        }
        self.end.forward(obj.clone())?;
        Ok(obj)
    }

    fn run_backward(&mut self) -> CoreResult<()> {
        let mut obj = self.end.backward(())?;
        for operation in self.proto.operations_mut().iter_mut().rev() {
            obj = operation.backward(obj)?;
        }
        self.begin.backward(obj)
    }
}

impl<T: Clone + 'static> Transaction for ReversibleTransaction<T> {
    type Operation = Transformation<T>;
    type Output = T;

    fn state(&self) -> TransactionState {
        self.proto.state()
    }

    fn supports_rollback(&self) -> bool {
        self.proto.supports_rollback()
    }

    fn add_operation(&mut self, operation: Transformation<T>) -> CoreResult<()> {
        self.proto.add_operation(operation)
    }

    fn commit(&mut self) -> CoreResult<T> {
        self.proto.begin_commit()?;
        debug!(
            transformations = self.proto.operation_count(),
            "committing reversible transaction"
        );
        let result = self.run_forward();
        if let Err(err) = &result {
            warn!(error = %err, "commit failed after the transaction was marked committed");
        }
        result
    }

    fn abort(&mut self) -> CoreResult<()> {
        self.proto.abort()?;
        debug!("aborted reversible transaction");
        Ok(())
    }

    fn rollback(&mut self) -> CoreResult<()> {
        self.proto.begin_rollback()?;
        debug!(
            transformations = self.proto.operation_count(),
            "rolling back reversible transaction"
        );
        let result = self.run_backward();
        if let Err(err) = &result {
            warn!(error = %err, "rollback failed part way; side effects may remain");
        }
        result
    }
}

impl<T> fmt::Debug for ReversibleTransaction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReversibleTransaction")
            .field("state", &self.proto.state())
            .field("operations", &self.proto.operation_count())
            .finish_non_exhaustive()
    }
}
