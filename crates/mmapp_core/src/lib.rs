//! # mmapp core
//!
//! The reusable core of the mmapp movie and performer catalogue.
//!
//! This crate provides:
//! - A transaction lifecycle state machine with commit, abort and rollback
//! - Reversible operations (suppliers, consumers, transformations)
//! - `Register`, an id-allocating entity table driven by reversible transactions
//! - `BiMap`, a many-to-many association matrix between two key domains
//! - `AssociationBehaviour`, `"lower..upper"` cardinality rules for associations

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod association;
mod bimap;
mod config;
mod entity;
mod error;
pub mod operation;
mod register;
pub mod transaction;

pub use association::{
    Association, AssociationBehaviour, Bound, BoundAccessors, CardinalityViolation, Side,
    ViolationKind,
};
pub use bimap::BiMap;
pub use config::{DuplicateIdPolicy, RegisterConfig};
pub use entity::{EntityId, Identifiable};
pub use error::{CoreError, CoreResult};
pub use operation::{reversible, FieldUpdate, FnReversible, ReversibleOperation};
pub use register::Register;
pub use transaction::{
    ProtoTransaction, ReversibleTransaction, SimpleTransaction, Transaction, TransactionState,
};
