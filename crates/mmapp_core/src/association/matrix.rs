//! A `BiMap` guarded by cardinality rules.

use super::behaviour::AssociationBehaviour;
use crate::bimap::BiMap;
use std::fmt;
use std::hash::Hash;
use tracing::debug;

/// Which key of the matrix a rule is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// The column key, counted by its number of rows.
    Column,
    /// The row key, counted by its number of columns.
    Row,
}

/// The change a rule refused, or the standing state it does not accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViolationKind {
    /// Adding a pair would exceed the upper bound.
    Append,
    /// Removing a pair would fall under the lower bound.
    Remove,
    /// The current count is outside the rule.
    Unsatisfied,
}

/// Describes a refused mutation or an unsatisfied key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalityViolation<K1, K2> {
    /// Side whose rule was violated.
    pub side: Side,
    /// What was attempted.
    pub kind: ViolationKind,
    /// Column key involved, if any.
    pub column: Option<K1>,
    /// Row key involved, if any.
    pub row: Option<K2>,
    /// Partner count of the checked key before the change.
    pub count: usize,
    /// Expression of the violated rule.
    pub rule: String,
}

type ViolationHandler<K1, K2> = Box<dyn FnMut(&CardinalityViolation<K1, K2>)>;

/// Association matrix that refuses mutations breaking its rules.
///
/// Each side may carry an [`AssociationBehaviour`]. [`link`](Self::link)
/// checks `can_append` for the column and the row before adding the pair,
/// [`unlink`](Self::unlink) checks `can_remove`. A refused mutation leaves
/// the matrix untouched and is reported to the violation handler.
pub struct Association<K1, K2> {
    matrix: BiMap<K1, K2>,
    column_rule: Option<AssociationBehaviour<K1>>,
    row_rule: Option<AssociationBehaviour<K2>>,
    on_violation: Option<ViolationHandler<K1, K2>>,
}

impl<K1, K2> Association<K1, K2>
where
    K1: Hash + Eq + Clone,
    K2: Hash + Eq + Clone,
{
    /// Creates an unconstrained association.
    #[must_use]
    pub fn new() -> Self {
        Self::from_matrix(BiMap::new())
    }

    /// Wraps an existing matrix. Pairs already in it are not checked.
    #[must_use]
    pub fn from_matrix(matrix: BiMap<K1, K2>) -> Self {
        Self {
            matrix,
            column_rule: None,
            row_rule: None,
            on_violation: None,
        }
    }

    /// Constrains how many rows each column may have.
    #[must_use]
    pub fn with_column_rule(mut self, rule: AssociationBehaviour<K1>) -> Self {
        self.column_rule = Some(rule);
        self
    }

    /// Constrains how many columns each row may have.
    #[must_use]
    pub fn with_row_rule(mut self, rule: AssociationBehaviour<K2>) -> Self {
        self.row_rule = Some(rule);
        self
    }

    /// Installs the handler called for every refused mutation.
    #[must_use]
    pub fn on_violation<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&CardinalityViolation<K1, K2>) + 'static,
    {
        self.on_violation = Some(Box::new(handler));
        self
    }

    /// Adds the pair if both rules allow one more partner.
    ///
    /// Returns true if the pair was added. An already present pair is left
    /// alone and yields false without consulting the rules.
    pub fn link(&mut self, column: K1, row: K2) -> bool {
        if self.matrix.contains(&column, &row) {
            return false;
        }

        let column_count = self.matrix.size_of_non_empty_rows(&column);
        if let Some(rule) = &self.column_rule {
            if !rule.can_append(&column, column_count) {
                let violation = violation(Side::Column, ViolationKind::Append, rule, column_count);
                self.report(violation, Some(column), Some(row));
                return false;
            }
        }

        let row_count = self.matrix.size_of_non_empty_columns(&row);
        if let Some(rule) = &self.row_rule {
            if !rule.can_append(&row, row_count) {
                let violation = violation(Side::Row, ViolationKind::Append, rule, row_count);
                self.report(violation, Some(column), Some(row));
                return false;
            }
        }

        self.matrix.add(column, row)
    }

    /// Removes the pair if both rules allow one partner less.
    ///
    /// Returns true if the pair was removed; false if it was absent or a
    /// rule refused.
    pub fn unlink(&mut self, column: &K1, row: &K2) -> bool {
        if !self.matrix.contains(column, row) {
            return false;
        }

        let column_count = self.matrix.size_of_non_empty_rows(column);
        if let Some(rule) = &self.column_rule {
            if !rule.can_remove(column, column_count) {
                let violation = violation(Side::Column, ViolationKind::Remove, rule, column_count);
                self.report(violation, Some(column.clone()), Some(row.clone()));
                return false;
            }
        }

        let row_count = self.matrix.size_of_non_empty_columns(row);
        if let Some(rule) = &self.row_rule {
            if !rule.can_remove(row, row_count) {
                let violation = violation(Side::Row, ViolationKind::Remove, rule, row_count);
                self.report(violation, Some(column.clone()), Some(row.clone()));
                return false;
            }
        }

        self.matrix.remove(column, row)
    }

    /// Returns true if `column`'s current row count satisfies the column rule.
    #[must_use]
    pub fn column_satisfied(&self, column: &K1) -> bool {
        self.column_rule.as_ref().is_none_or(|rule| {
            rule.applies_to(column, self.matrix.size_of_non_empty_rows(column))
        })
    }

    /// Returns true if `row`'s current column count satisfies the row rule.
    #[must_use]
    pub fn row_satisfied(&self, row: &K2) -> bool {
        self.row_rule.as_ref().is_none_or(|rule| {
            rule.applies_to(row, self.matrix.size_of_non_empty_columns(row))
        })
    }

    /// Lists the keys present in the matrix whose count breaks their rule.
    ///
    /// Keys without any pair are not in the matrix; check those with
    /// [`column_satisfied`](Self::column_satisfied) and
    /// [`row_satisfied`](Self::row_satisfied).
    #[must_use]
    pub fn violations(&self) -> Vec<CardinalityViolation<K1, K2>> {
        let mut found = Vec::new();

        if let Some(rule) = &self.column_rule {
            for (column, rows) in self.matrix.columns() {
                if !rule.applies_to(column, rows.len()) {
                    let mut v = violation(Side::Column, ViolationKind::Unsatisfied, rule, rows.len());
                    v.column = Some(column.clone());
                    found.push(v);
                }
            }
        }

        if let Some(rule) = &self.row_rule {
            for (row, columns) in self.matrix.rows() {
                if !rule.applies_to(row, columns.len()) {
                    let mut v = violation(Side::Row, ViolationKind::Unsatisfied, rule, columns.len());
                    v.row = Some(row.clone());
                    found.push(v);
                }
            }
        }

        found
    }

    /// Returns the underlying matrix.
    #[must_use]
    pub fn matrix(&self) -> &BiMap<K1, K2> {
        &self.matrix
    }

    /// Unwraps the underlying matrix.
    #[must_use]
    pub fn into_matrix(self) -> BiMap<K1, K2> {
        self.matrix
    }

    fn report(
        &mut self,
        mut violation: CardinalityViolation<K1, K2>,
        column: Option<K1>,
        row: Option<K2>,
    ) {
        violation.column = column;
        violation.row = row;
        debug!(
            side = ?violation.side,
            kind = ?violation.kind,
            count = violation.count,
            rule = %violation.rule,
            "association refused"
        );
        if let Some(handler) = self.on_violation.as_mut() {
            handler(&violation);
        }
    }
}

fn violation<S, K1, K2>(
    side: Side,
    kind: ViolationKind,
    rule: &AssociationBehaviour<S>,
    count: usize,
) -> CardinalityViolation<K1, K2> {
    CardinalityViolation {
        side,
        kind,
        column: None,
        row: None,
        count,
        rule: rule.expression().to_string(),
    }
}

impl<K1, K2> Default for Association<K1, K2>
where
    K1: Hash + Eq + Clone,
    K2: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K1: fmt::Debug, K2: fmt::Debug> fmt::Debug for Association<K1, K2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("matrix", &self.matrix)
            .field("column_rule", &self.column_rule)
            .field("row_rule", &self.row_rule)
            .finish_non_exhaustive()
    }
}
