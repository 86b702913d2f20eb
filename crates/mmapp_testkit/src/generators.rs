//! Property-based test generators using proptest.
//!
//! Provides strategies for generating catalogue records, matrix edit
//! sequences, register edit sequences and cardinality rules.

use crate::fixtures::{Movie, Performer};
use mmapp_core::EntityId;
use proptest::prelude::*;

/// Strategy for generating entity ids in a small range, so that sequences
/// revisit the same ids.
pub fn entity_id_strategy(max: u32) -> impl Strategy<Value = EntityId> {
    (0..max).prop_map(EntityId::new)
}

/// Strategy for generating movie titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{0,11}( [A-Z][a-z]{0,7}){0,2}").expect("Invalid regex")
}

/// Strategy for generating performer names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{1,8} [A-Z][a-z]{1,10}").expect("Invalid regex")
}

/// Strategy for generating a movie with the given id.
pub fn movie_strategy(id: u32) -> impl Strategy<Value = Movie> {
    (title_strategy(), 1900u16..2030, -1i64..12).prop_map(move |(title, year, cast_limit)| Movie {
        id: EntityId::new(id),
        title,
        year,
        cast_limit,
    })
}

/// Strategy for generating a performer with the given id.
pub fn performer_strategy(id: u32) -> impl Strategy<Value = Performer> {
    (name_strategy(), prop::option::of(1900u16..2010)).prop_map(move |(name, born)| Performer {
        id: EntityId::new(id),
        name,
        born,
    })
}

/// A single association matrix edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixOperation {
    /// `add(column, row)`.
    Add(u8, u8),
    /// `remove(column, row)`.
    Remove(u8, u8),
}

/// Strategy for generating matrix edits over `keys` columns and rows.
pub fn matrix_operation_strategy(keys: u8) -> impl Strategy<Value = MatrixOperation> {
    prop_oneof![
        3 => (0..keys, 0..keys).prop_map(|(c, r)| MatrixOperation::Add(c, r)),
        1 => (0..keys, 0..keys).prop_map(|(c, r)| MatrixOperation::Remove(c, r)),
    ]
}

/// Strategy for generating a sequence of matrix edits.
pub fn matrix_sequence_strategy(
    keys: u8,
    max_ops: usize,
) -> impl Strategy<Value = Vec<MatrixOperation>> {
    prop::collection::vec(matrix_operation_strategy(keys), 0..max_ops)
}

/// A single register edit, addressed by slot so that it stays meaningful
/// while the register changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOperation {
    /// Create a movie with this title.
    Create(String),
    /// Retitle the n-th stored movie, modulo the number stored.
    Retitle(usize, String),
    /// Remove the n-th stored movie, modulo the number stored.
    Remove(usize),
    /// Roll back the most recent committed transaction not yet rolled back.
    RollbackLast,
}

/// Strategy for generating register edits.
pub fn register_operation_strategy() -> impl Strategy<Value = RegisterOperation> {
    prop_oneof![
        4 => title_strategy().prop_map(RegisterOperation::Create),
        2 => (any::<usize>(), title_strategy())
            .prop_map(|(slot, title)| RegisterOperation::Retitle(slot, title)),
        2 => any::<usize>().prop_map(RegisterOperation::Remove),
        1 => Just(RegisterOperation::RollbackLast),
    ]
}

/// Strategy for generating a sequence of register edits.
pub fn register_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<RegisterOperation>> {
    prop::collection::vec(register_operation_strategy(), min_ops..max_ops)
}

/// Strategy for generating valid `"lower..upper"` expressions with fixed or
/// unlimited bounds.
pub fn rule_expression_strategy() -> impl Strategy<Value = String> {
    (0usize..5, prop::option::of(0usize..5)).prop_map(|(lower, extra)| match extra {
        Some(extra) => format!("{lower}..{}", lower + extra),
        None => format!("{lower}..*"),
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
