//! `"lower..upper"` cardinality rules.

use crate::error::{CoreError, CoreResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Computes a bound from the source entity.
type Accessor<S> = Arc<dyn Fn(&S) -> i64 + Send + Sync>;

/// Named dynamic bounds a rule may refer to.
///
/// Populated once when associations are configured. A rule such as
/// `"1..castSize"` looks `castSize` up here and evaluates it per source.
pub struct BoundAccessors<S> {
    table: HashMap<String, Accessor<S>>,
}

impl<S> BoundAccessors<S> {
    /// Creates an empty accessor table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Registers `accessor` under `name`, replacing any previous entry.
    pub fn insert<F>(&mut self, name: impl Into<String>, accessor: F)
    where
        F: Fn(&S) -> i64 + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(accessor));
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&S) -> i64 + Send + Sync + 'static,
    {
        self.insert(name, accessor);
        self
    }

    /// Returns true if an accessor is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<Accessor<S>> {
        self.table.get(name).cloned()
    }
}

impl<S> Default for BoundAccessors<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for BoundAccessors<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

/// One side of a cardinality rule.
pub enum Bound<S> {
    /// A literal count.
    Fixed(usize),
    /// No limit. Only valid as an upper bound.
    Unlimited,
    /// A count computed from the source entity.
    Dynamic {
        /// Accessor name as written in the rule.
        name: String,
        /// The registered accessor.
        accessor: Accessor<S>,
    },
}

impl<S> Clone for Bound<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(n) => Self::Fixed(*n),
            Self::Unlimited => Self::Unlimited,
            Self::Dynamic { name, accessor } => Self::Dynamic {
                name: name.clone(),
                accessor: Arc::clone(accessor),
            },
        }
    }
}

impl<S> fmt::Debug for Bound<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "Fixed({n})"),
            Self::Unlimited => f.write_str("Unlimited"),
            Self::Dynamic { name, .. } => write!(f, "Dynamic({name})"),
        }
    }
}

/// Minimum and maximum number of associations a source may take part in.
///
/// Parsed from `"lower..upper"`, where each bound is an integer literal, an
/// accessor name from [`BoundAccessors`], or (upper only) `*` for no limit.
/// Negative values, literal or computed, mean 0 for the lower bound and no
/// limit for the upper bound.
///
/// ```
/// use mmapp_core::{AssociationBehaviour, BoundAccessors};
///
/// struct Movie {
///     lead_roles: i64,
/// }
///
/// let accessors = BoundAccessors::new().with("leadRoles", |m: &Movie| m.lead_roles);
/// let rule = AssociationBehaviour::parse("leadRoles..*", &accessors).unwrap();
///
/// let movie = Movie { lead_roles: 2 };
/// assert!(!rule.applies_to(&movie, 1));
/// assert!(rule.can_append(&movie, 1));
/// assert!(!rule.can_remove(&movie, 2));
/// ```
pub struct AssociationBehaviour<S> {
    expression: String,
    lower: Bound<S>,
    upper: Bound<S>,
}

impl<S> AssociationBehaviour<S> {
    /// Parses a `"lower..upper"` rule.
    ///
    /// Fails with [`CoreError::InvalidAssociationRule`] for malformed
    /// expressions and [`CoreError::UnknownBoundAccessor`] for accessor names
    /// missing from `accessors`.
    pub fn parse(expression: &str, accessors: &BoundAccessors<S>) -> CoreResult<Self> {
        let (lower, upper) = expression
            .split_once("..")
            .ok_or_else(|| CoreError::invalid_rule(expression, "expected `lower..upper`"))?;

        let lower = parse_bound(expression, lower.trim(), accessors, false)?;
        let upper = parse_bound(expression, upper.trim(), accessors, true)?;

        if let (Bound::Fixed(min), Bound::Fixed(max)) = (&lower, &upper) {
            if min > max {
                return Err(CoreError::invalid_rule(
                    expression,
                    format!("lower bound {min} exceeds upper bound {max}"),
                ));
            }
        }

        Ok(Self {
            expression: expression.to_string(),
            lower,
            upper,
        })
    }

    /// Returns the expression this rule was parsed from.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the lower bound.
    #[must_use]
    pub fn lower_bound(&self) -> &Bound<S> {
        &self.lower
    }

    /// Returns the upper bound.
    #[must_use]
    pub fn upper_bound(&self) -> &Bound<S> {
        &self.upper
    }

    /// Evaluates the minimum for `source`.
    #[must_use]
    pub fn lower(&self, source: &S) -> usize {
        match &self.lower {
            Bound::Fixed(n) => *n,
            Bound::Unlimited => 0,
            Bound::Dynamic { accessor, .. } => {
                usize::try_from(accessor(source)).unwrap_or(0)
            }
        }
    }

    /// Evaluates the maximum for `source`; `None` means unlimited.
    #[must_use]
    pub fn upper(&self, source: &S) -> Option<usize> {
        match &self.upper {
            Bound::Fixed(n) => Some(*n),
            Bound::Unlimited => None,
            Bound::Dynamic { accessor, .. } => usize::try_from(accessor(source)).ok(),
        }
    }

    /// Returns true if `source` may gain one more association.
    #[must_use]
    pub fn can_append(&self, source: &S, current: usize) -> bool {
        self.admits(source, current as i128 + 1)
    }

    /// Returns true if `source` may lose one association.
    #[must_use]
    pub fn can_remove(&self, source: &S, current: usize) -> bool {
        self.admits(source, current as i128 - 1)
    }

    /// Returns true if `current` associations already satisfy the rule.
    #[must_use]
    pub fn applies_to(&self, source: &S, current: usize) -> bool {
        self.admits(source, current as i128)
    }

    fn admits(&self, source: &S, count: i128) -> bool {
        if count < self.lower(source) as i128 {
            return false;
        }
        match self.upper(source) {
            Some(max) => count <= max as i128,
            None => true,
        }
    }
}

impl<S> Clone for AssociationBehaviour<S> {
    fn clone(&self) -> Self {
        Self {
            expression: self.expression.clone(),
            lower: self.lower.clone(),
            upper: self.upper.clone(),
        }
    }
}

impl<S> fmt::Debug for AssociationBehaviour<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationBehaviour")
            .field("expression", &self.expression)
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .finish()
    }
}

impl<S> fmt::Display for AssociationBehaviour<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn parse_bound<S>(
    expression: &str,
    token: &str,
    accessors: &BoundAccessors<S>,
    is_upper: bool,
) -> CoreResult<Bound<S>> {
    let side = if is_upper { "upper" } else { "lower" };

    if token.is_empty() {
        return Err(CoreError::invalid_rule(
            expression,
            format!("missing {side} bound"),
        ));
    }

    if let Ok(value) = token.parse::<i64>() {
        return Ok(match usize::try_from(value) {
            Ok(n) => Bound::Fixed(n),
            Err(_) if is_upper => Bound::Unlimited,
            Err(_) => Bound::Fixed(0),
        });
    }

    if token == "*" {
        return if is_upper {
            Ok(Bound::Unlimited)
        } else {
            Err(CoreError::invalid_rule(
                expression,
                "`*` is only allowed as the upper bound",
            ))
        };
    }

    if !is_accessor_name(token) {
        return Err(CoreError::invalid_rule(
            expression,
            format!("{side} bound {token:?} is not a number, `*` or accessor name"),
        ));
    }

    let accessor = accessors
        .get(token)
        .ok_or_else(|| CoreError::unknown_accessor(token))?;
    Ok(Bound::Dynamic {
        name: token.to_string(),
        accessor,
    })
}

fn is_accessor_name(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Performer {
        max_roles: i64,
        min_roles: i64,
    }

    fn performer(min_roles: i64, max_roles: i64) -> Performer {
        Performer {
            max_roles,
            min_roles,
        }
    }

    fn accessors() -> BoundAccessors<Performer> {
        BoundAccessors::new()
            .with("maxRoles", |p: &Performer| p.max_roles)
            .with("minRoles", |p: &Performer| p.min_roles)
    }

    fn rule(expression: &str) -> AssociationBehaviour<Performer> {
        AssociationBehaviour::parse(expression, &accessors()).unwrap()
    }

    #[test]
    fn fixed_bounds() {
        let rule = rule("1..3");
        let p = performer(0, 0);

        assert!(!rule.applies_to(&p, 0));
        assert!(rule.applies_to(&p, 1));
        assert!(rule.applies_to(&p, 3));
        assert!(!rule.applies_to(&p, 4));

        assert!(rule.can_append(&p, 2));
        assert!(!rule.can_append(&p, 3));
        assert!(rule.can_remove(&p, 2));
        assert!(!rule.can_remove(&p, 1));
    }

    #[test]
    fn unlimited_upper() {
        let rule = rule("0..*");
        let p = performer(0, 0);

        assert!(rule.can_append(&p, 10_000));
        assert!(!rule.can_remove(&p, 0));
        assert_eq!(rule.upper(&p), None);
    }

    #[test]
    fn whitespace_is_ignored() {
        let rule = rule(" 2 .. 4 ");
        assert_eq!(rule.lower(&performer(0, 0)), 2);
        assert_eq!(rule.upper(&performer(0, 0)), Some(4));
    }

    #[test]
    fn dynamic_bounds_evaluate_per_source() {
        let rule = rule("minRoles..maxRoles");

        let busy = performer(1, 5);
        assert!(rule.can_append(&busy, 4));
        assert!(!rule.can_append(&busy, 5));

        let idle = performer(0, 1);
        assert!(rule.applies_to(&idle, 0));
        assert!(!rule.can_append(&idle, 1));
    }

    #[test]
    fn negative_dynamic_bounds_are_clamped() {
        let rule = rule("minRoles..maxRoles");
        let p = performer(-3, -1);

        assert_eq!(rule.lower(&p), 0);
        assert_eq!(rule.upper(&p), None);
        assert!(rule.can_append(&p, 1_000));
    }

    #[test]
    fn negative_literals_are_clamped() {
        let rule = rule("-1..-1");
        let p = performer(0, 0);
        assert_eq!(rule.lower(&p), 0);
        assert_eq!(rule.upper(&p), None);
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expression in ["", "3", "1..", "..2", "*..3", "1..2x", "a b..3"] {
            let err = AssociationBehaviour::parse(expression, &accessors()).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidAssociationRule { .. }),
                "{expression:?} gave {err:?}"
            );
            assert!(err.to_string().contains(&format!("{expression:?}")));
        }
    }

    #[test]
    fn inverted_fixed_bounds_are_rejected() {
        let err = AssociationBehaviour::parse("3..1", &accessors()).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn unknown_accessor_is_named() {
        let err = AssociationBehaviour::parse("0..castSize", &accessors()).unwrap_err();
        assert_eq!(err, CoreError::unknown_accessor("castSize"));
    }

    #[test]
    fn display_is_the_expression() {
        assert_eq!(rule("0..maxRoles").to_string(), "0..maxRoles");
        assert!(matches!(
            rule("0..maxRoles").upper_bound(),
            Bound::Dynamic { name, .. } if name == "maxRoles"
        ));
    }
}
