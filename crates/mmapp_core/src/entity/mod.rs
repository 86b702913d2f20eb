//! Entity identity.

mod id;

pub use id::{EntityId, Identifiable};
