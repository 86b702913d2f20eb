//! Reversible operations.
//!
//! Every step a [`ReversibleTransaction`](crate::ReversibleTransaction)
//! executes is a [`ReversibleOperation`]: a forward function paired with the
//! backward function that undoes it. The three shapes a transaction needs are
//! all specializations of that one capability:
//!
//! - **Supplier** (`ReversibleOperation<(), T>`): the begin anchor. Produces
//!   the value; backward takes it back to undo the production.
//! - **Transformation** (`ReversibleOperation<T, T>`): staged in the middle.
//! - **Consumer** (`ReversibleOperation<T, ()>`): the end anchor. Accepts the
//!   final value; backward hands the committed value back for rollback.
//!
//! Operations capture only what they need to invert themselves, e.g. the
//! prior value of a field they overwrote.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::marker::PhantomData;

/// A forward/backward function pair.
///
/// `backward(forward(a))` must restore every side effect `forward` had and
/// yield a value observationally equal to `a`.
pub trait ReversibleOperation<A, B> {
    /// Applies the operation.
    fn forward(&mut self, input: A) -> CoreResult<B>;

    /// Undoes a previous [`forward`](Self::forward).
    fn backward(&mut self, output: B) -> CoreResult<A>;
}

/// Begin anchor of a reversible transaction.
pub type Supplier<T> = Box<dyn ReversibleOperation<(), T>>;

/// End anchor of a reversible transaction.
pub type Consumer<T> = Box<dyn ReversibleOperation<T, ()>>;

/// A staged step of a reversible transaction.
pub type Transformation<T> = Box<dyn ReversibleOperation<T, T>>;

impl<A, B, O> ReversibleOperation<A, B> for Box<O>
where
    O: ReversibleOperation<A, B> + ?Sized,
{
    fn forward(&mut self, input: A) -> CoreResult<B> {
        (**self).forward(input)
    }

    fn backward(&mut self, output: B) -> CoreResult<A> {
        (**self).backward(output)
    }
}

/// A reversible operation built from two closures.
///
/// Created by [`reversible`].
pub struct FnReversible<F, G> {
    forward: F,
    backward: G,
}

/// Builds a reversible operation from a forward and a backward closure.
///
/// ```
/// use mmapp_core::{reversible, ReversibleOperation};
///
/// let mut double = reversible(|x: i64| Ok(x * 2), |x: i64| Ok(x / 2));
/// assert_eq!(double.forward(21).unwrap(), 42);
/// assert_eq!(double.backward(42).unwrap(), 21);
/// ```
pub fn reversible<A, B, F, G>(forward: F, backward: G) -> FnReversible<F, G>
where
    F: FnMut(A) -> CoreResult<B>,
    G: FnMut(B) -> CoreResult<A>,
{
    FnReversible { forward, backward }
}

impl<A, B, F, G> ReversibleOperation<A, B> for FnReversible<F, G>
where
    F: FnMut(A) -> CoreResult<B>,
    G: FnMut(B) -> CoreResult<A>,
{
    fn forward(&mut self, input: A) -> CoreResult<B> {
        (self.forward)(input)
    }

    fn backward(&mut self, output: B) -> CoreResult<A> {
        (self.backward)(output)
    }
}

impl<F, G> fmt::Debug for FnReversible<F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReversible").finish_non_exhaustive()
    }
}

/// Sets one field of a value, remembering the prior content for rollback.
///
/// This is the transformation a detail form stages for every edited field.
pub struct FieldUpdate<T, V, G, S> {
    value: V,
    prior: Option<V>,
    get: G,
    set: S,
    _target: PhantomData<fn(T) -> T>,
}

impl<T, V, G, S> FieldUpdate<T, V, G, S>
where
    V: Clone,
    G: Fn(&T) -> V,
    S: FnMut(&mut T, V),
{
    /// Creates an update that writes `value` through `set`.
    ///
    /// `get` reads the field so the prior content can be restored.
    pub fn new(value: V, get: G, set: S) -> Self {
        Self {
            value,
            prior: None,
            get,
            set,
            _target: PhantomData,
        }
    }

    /// Returns the value this update writes.
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<T, V, G, S> ReversibleOperation<T, T> for FieldUpdate<T, V, G, S>
where
    V: Clone,
    G: Fn(&T) -> V,
    S: FnMut(&mut T, V),
{
    fn forward(&mut self, mut target: T) -> CoreResult<T> {
        self.prior = Some((self.get)(&target));
        (self.set)(&mut target, self.value.clone());
        Ok(target)
    }

    fn backward(&mut self, mut target: T) -> CoreResult<T> {
        let prior = self
            .prior
            .take()
            .ok_or_else(|| CoreError::illegal_operation("field update was never applied"))?;
        (self.set)(&mut target, prior);
        Ok(target)
    }
}

impl<T, V: fmt::Debug, G, S> fmt::Debug for FieldUpdate<T, V, G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldUpdate")
            .field("value", &self.value)
            .field("prior", &self.prior)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Film {
        title: String,
        rating: u8,
    }

    fn film() -> Film {
        Film {
            title: "Alien".into(),
            rating: 3,
        }
    }

    #[test]
    fn closure_operation_runs_both_directions() {
        let mut op = reversible(|s: String| Ok(s.len()), |n: usize| Ok("x".repeat(n)));
        assert_eq!(op.forward("abc".into()).unwrap(), 3);
        assert_eq!(op.backward(2).unwrap(), "xx");
    }

    #[test]
    fn boxed_operation_delegates() {
        let mut op: Transformation<i32> =
            Box::new(reversible(|x: i32| Ok(x + 1), |x: i32| Ok(x - 1)));
        assert_eq!(op.forward(1).unwrap(), 2);
        assert_eq!(op.backward(2).unwrap(), 1);
    }

    #[test]
    fn field_update_restores_prior_value() {
        let mut update = FieldUpdate::new(
            5,
            |f: &Film| f.rating,
            |f: &mut Film, v: u8| f.rating = v,
        );

        let updated = update.forward(film()).unwrap();
        assert_eq!(updated.rating, 5);
        assert_eq!(updated.title, "Alien");

        let restored = update.backward(updated).unwrap();
        assert_eq!(restored, film());
    }

    #[test]
    fn field_update_backward_without_forward_fails() {
        let mut update = FieldUpdate::new(
            "Aliens".to_string(),
            |f: &Film| f.title.clone(),
            |f: &mut Film, v: String| f.title = v,
        );
        let err = update.backward(film()).unwrap_err();
        assert!(err.is_illegal_operation());
    }

    #[test]
    fn operation_failure_propagates() {
        let mut op = reversible(
            |_: i32| -> CoreResult<i32> { Err(CoreError::operation_failed("boom")) },
            |x: i32| Ok(x),
        );
        assert_eq!(
            op.forward(1).unwrap_err(),
            CoreError::operation_failed("boom")
        );
    }
}
