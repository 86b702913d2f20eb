//! Model-checking harnesses.
//!
//! Each harness drives a real register or matrix alongside a plain model and
//! asserts after every step that the two agree.

use crate::fixtures::{create_movie, movie_register, remove_movie, retitle_movie, Movie};
use crate::generators::{MatrixOperation, RegisterOperation};
use mmapp_core::{BiMap, EntityId, Register, ReversibleTransaction, Transaction};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// A movie register checked against a `BTreeMap` model.
pub struct RegisterHarness {
    /// The register under test.
    pub register: Register<Movie>,
    model: BTreeMap<EntityId, Movie>,
    undo: Vec<(ReversibleTransaction<Movie>, BTreeMap<EntityId, Movie>)>,
}

impl RegisterHarness {
    /// Creates a harness over an empty register.
    pub fn new() -> Self {
        Self {
            register: movie_register(),
            model: BTreeMap::new(),
            undo: Vec::new(),
        }
    }

    /// Applies one edit to register and model, then verifies them.
    pub fn apply(&mut self, operation: &RegisterOperation) {
        debug!(?operation, tracked = self.model.len(), "applying register edit");
        let before = self.model.clone();
        match operation {
            RegisterOperation::Create(title) => {
                let expected = self.next_free_id();
                let (movie, txn) =
                    create_movie(&self.register, title).expect("Failed to create movie");
                assert_eq!(movie.id, expected, "creation must take the lowest free id");
                self.model.insert(movie.id, movie);
                self.undo.push((txn, before));
            }
            RegisterOperation::Retitle(slot, title) => {
                let Some(id) = self.pick(*slot) else { return };
                let (movie, txn) =
                    retitle_movie(&self.register, id, title).expect("Failed to retitle movie");
                self.model.insert(id, movie);
                self.undo.push((txn, before));
            }
            RegisterOperation::Remove(slot) => {
                let Some(id) = self.pick(*slot) else { return };
                let (movie, txn) = remove_movie(&self.register, id).expect("Failed to remove movie");
                assert_eq!(self.model.remove(&id), Some(movie));
                self.undo.push((txn, before));
            }
            RegisterOperation::RollbackLast => {
                let Some((mut txn, snapshot)) = self.undo.pop() else { return };
                txn.rollback().expect("Failed to roll back");
                assert!(txn.was_rolled_back());
                self.model = snapshot;
            }
        }
        self.verify_all();
    }

    /// Verifies every modelled movie is stored and the space accounting adds
    /// up.
    pub fn verify_all(&self) {
        assert_eq!(self.register.used_space(), self.model.len());
        assert_eq!(
            self.register.used_space() + self.register.free_space(),
            self.register.slot_count()
        );
        for (id, expected) in &self.model {
            assert_eq!(
                self.register.get_element_by_id(*id).as_ref(),
                Some(expected),
                "Movie mismatch for {id}"
            );
        }
        for id in self.register.free_ids() {
            assert!(!self.model.contains_key(&id), "{id} is both free and used");
        }
    }

    /// Returns the count of modelled movies.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }

    fn pick(&self, slot: usize) -> Option<EntityId> {
        if self.model.is_empty() {
            return None;
        }
        self.model.keys().nth(slot % self.model.len()).copied()
    }

    fn next_free_id(&self) -> EntityId {
        (0u32..)
            .map(EntityId::new)
            .find(|id| !self.model.contains_key(id))
            .unwrap_or_default()
    }
}

impl Default for RegisterHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A `BiMap` checked against a set of pairs.
#[derive(Debug, Default)]
pub struct MatrixHarness {
    /// The matrix under test.
    pub matrix: BiMap<u8, u8>,
    model: HashSet<(u8, u8)>,
}

impl MatrixHarness {
    /// Creates a harness over an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one edit to matrix and model, then verifies them.
    pub fn apply(&mut self, operation: MatrixOperation) {
        match operation {
            MatrixOperation::Add(c, r) => {
                assert_eq!(self.matrix.add(c, r), self.model.insert((c, r)));
            }
            MatrixOperation::Remove(c, r) => {
                assert_eq!(self.matrix.remove(&c, &r), self.model.remove(&(c, r)));
            }
        }
        self.verify_all();
    }

    /// Verifies both indices hold exactly the modelled pairs.
    pub fn verify_all(&self) {
        assert_eq!(self.matrix.len(), self.model.len());
        for &(c, r) in &self.model {
            assert!(self.matrix.contains(&c, &r));
        }
        assert_symmetric(&self.matrix);
    }
}

/// Asserts `row ∈ get_column(column)` iff `column ∈ get_row(row)`, and that
/// no empty list is kept.
pub fn assert_symmetric<K1, K2>(matrix: &BiMap<K1, K2>)
where
    K1: std::hash::Hash + Eq + Clone + std::fmt::Debug,
    K2: std::hash::Hash + Eq + Clone + std::fmt::Debug,
{
    for (column, rows) in matrix.columns() {
        assert!(!rows.is_empty(), "empty column list kept for {column:?}");
        for row in rows {
            let back = matrix.get_row(row).unwrap_or_default();
            assert!(back.contains(column), "{column:?} -> {row:?} has no mirror");
        }
    }
    for (row, columns) in matrix.rows() {
        assert!(!columns.is_empty(), "empty row list kept for {row:?}");
        for column in columns {
            let forth = matrix.get_column(column).unwrap_or_default();
            assert!(forth.contains(row), "{row:?} -> {column:?} has no mirror");
        }
    }
}
