//! Transactions with commit, abort and rollback.
//!
//! A transaction stages an ordered sequence of operations while it is
//! under construction and is then finished by exactly one of commit or
//! abort. Reversible transactions can additionally be rolled back after
//! commit, which undoes every step in strict reverse order.
//!
//! Transactions are not synchronized. Staging and committing one
//! transaction from several threads requires external serialization.

mod reversible;
mod simple;
mod state;

pub use reversible::ReversibleTransaction;
pub use simple::{Action, SimpleTransaction};
pub use state::{ProtoTransaction, TransactionState};

use crate::error::CoreResult;

/// Common interface of all transaction kinds.
pub trait Transaction {
    /// The type of a staged operation.
    type Operation;

    /// The value a successful commit produces.
    type Output;

    /// Returns the current state.
    fn state(&self) -> TransactionState;

    /// Returns whether a committed transaction of this kind can be rolled back.
    fn supports_rollback(&self) -> bool;

    /// Stages an operation.
    ///
    /// Fails with [`CoreError::IllegalOperation`](crate::CoreError::IllegalOperation)
    /// unless the transaction is under construction.
    fn add_operation(&mut self, operation: Self::Operation) -> CoreResult<()>;

    /// Commits the transaction and executes its operations.
    ///
    /// The transaction is `Committed` as soon as this is called on a
    /// transaction under construction, whether or not execution succeeds.
    fn commit(&mut self) -> CoreResult<Self::Output>;

    /// Aborts the transaction, discarding its operations.
    fn abort(&mut self) -> CoreResult<()>;

    /// Undoes a committed transaction.
    fn rollback(&mut self) -> CoreResult<()>;

    /// Returns true while operations can still be staged.
    fn is_under_construction(&self) -> bool {
        self.state() == TransactionState::UnderConstruction
    }

    /// Returns true if the transaction has been committed and not rolled back.
    fn was_committed(&self) -> bool {
        self.state() == TransactionState::Committed
    }

    /// Returns true if the transaction has been aborted.
    fn was_aborted(&self) -> bool {
        self.state() == TransactionState::Aborted
    }

    /// Returns true if the transaction has been rolled back.
    fn was_rolled_back(&self) -> bool {
        self.state() == TransactionState::RolledBack
    }
}
