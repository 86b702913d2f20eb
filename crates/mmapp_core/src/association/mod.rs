//! Cardinality rules for many-to-many associations.
//!
//! [`AssociationBehaviour`] parses `"lower..upper"` rules whose bounds may
//! depend on the source entity through [`BoundAccessors`]. [`Association`]
//! applies a rule to each side of a [`BiMap`](crate::BiMap).

mod behaviour;
mod matrix;

pub use behaviour::{AssociationBehaviour, Bound, BoundAccessors};
pub use matrix::{Association, CardinalityViolation, Side, ViolationKind};
