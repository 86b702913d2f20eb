//! Domain records and register fixtures.
//!
//! `Movie` and `Performer` are the two entity kinds of the catalogue. The
//! helpers here build registers over them and run the common transactions.

use mmapp_core::{
    BiMap, CoreError, CoreResult, EntityId, FieldUpdate, Identifiable, Register, RegisterConfig,
    ReversibleOperation, ReversibleTransaction, Transaction,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A movie of the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Movie {
    /// Register id.
    pub id: EntityId,
    /// Display title.
    pub title: String,
    /// Release year, 0 if unknown.
    #[serde(default)]
    pub year: u16,
    /// Maximum cast size; negative means unlimited.
    #[serde(default = "unlimited")]
    pub cast_limit: i64,
}

fn unlimited() -> i64 {
    -1
}

impl Movie {
    /// Creates an untitled movie. This is the movie register's constructor.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            title: String::new(),
            year: 0,
            cast_limit: unlimited(),
        }
    }

    /// Creates a titled movie.
    #[must_use]
    pub fn titled(id: u32, title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::new(EntityId::new(id))
        }
    }
}

impl Identifiable for Movie {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// A performer of the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Performer {
    /// Register id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Year of birth, if known.
    #[serde(default)]
    pub born: Option<u16>,
}

impl Performer {
    /// Creates an unnamed performer. This is the performer register's
    /// constructor.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            name: String::new(),
            born: None,
        }
    }

    /// Creates a named performer.
    #[must_use]
    pub fn named(id: u32, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::new(EntityId::new(id))
        }
    }
}

impl Identifiable for Performer {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Edit that sets a movie's title.
pub fn set_title(title: &str) -> impl ReversibleOperation<Movie, Movie> {
    FieldUpdate::new(
        title.to_string(),
        |m: &Movie| m.title.clone(),
        |m: &mut Movie, v| m.title = v,
    )
}

/// Edit that sets a movie's release year.
pub fn set_year(year: u16) -> impl ReversibleOperation<Movie, Movie> {
    FieldUpdate::new(year, |m: &Movie| m.year, |m: &mut Movie, v| m.year = v)
}

/// Edit that sets a movie's cast limit.
pub fn set_cast_limit(limit: i64) -> impl ReversibleOperation<Movie, Movie> {
    FieldUpdate::new(
        limit,
        |m: &Movie| m.cast_limit,
        |m: &mut Movie, v| m.cast_limit = v,
    )
}

/// Edit that sets a performer's name.
pub fn set_name(name: &str) -> impl ReversibleOperation<Performer, Performer> {
    FieldUpdate::new(
        name.to_string(),
        |p: &Performer| p.name.clone(),
        |p: &mut Performer, v| p.name = v,
    )
}

/// Creates an empty movie register.
#[must_use]
pub fn movie_register() -> Register<Movie> {
    Register::new(Movie::new)
}

/// Creates an empty performer register.
#[must_use]
pub fn performer_register() -> Register<Performer> {
    Register::new(Performer::new)
}

/// Creates a movie register holding `titles` at ids 0, 1, 2, ...
///
/// # Panics
///
/// Never in practice: the generated ids are distinct.
#[must_use]
pub fn seeded_movies(titles: &[&str]) -> Register<Movie> {
    let movies = titles
        .iter()
        .zip(0u32..)
        .map(|(title, id)| Movie::titled(id, title));
    Register::from_elements(Movie::new, movies, RegisterConfig::default())
        .expect("fixture ids are distinct")
}

/// Creates a performer register holding `names` at ids 0, 1, 2, ...
///
/// # Panics
///
/// Never in practice: the generated ids are distinct.
#[must_use]
pub fn seeded_performers(names: &[&str]) -> Register<Performer> {
    let performers = names
        .iter()
        .zip(0u32..)
        .map(|(name, id)| Performer::named(id, name));
    Register::from_elements(Performer::new, performers, RegisterConfig::default())
        .expect("fixture ids are distinct")
}

/// Creates and commits a movie titled `title`.
///
/// Returns the created movie and the committed transaction, which can be
/// rolled back.
pub fn create_movie(
    register: &Register<Movie>,
    title: &str,
) -> CoreResult<(Movie, ReversibleTransaction<Movie>)> {
    let mut txn = register.start_creation_transaction();
    txn.stage(set_title(title))?;
    let movie = txn.commit()?;
    Ok((movie, txn))
}

/// Creates and commits a performer named `name`.
pub fn create_performer(
    register: &Register<Performer>,
    name: &str,
) -> CoreResult<(Performer, ReversibleTransaction<Performer>)> {
    let mut txn = register.start_creation_transaction();
    txn.stage(set_name(name))?;
    let performer = txn.commit()?;
    Ok((performer, txn))
}

/// Retitles the movie stored at `id` and commits.
pub fn retitle_movie(
    register: &Register<Movie>,
    id: EntityId,
    title: &str,
) -> CoreResult<(Movie, ReversibleTransaction<Movie>)> {
    let current = register
        .get_element_by_id(id)
        .ok_or(CoreError::EntityNotFound { id })?;
    let mut txn = register.start_update_transaction_for(current);
    txn.stage(set_title(title))?;
    let movie = txn.commit()?;
    Ok((movie, txn))
}

/// Removes the movie stored at `id` and commits.
pub fn remove_movie(
    register: &Register<Movie>,
    id: EntityId,
) -> CoreResult<(Movie, ReversibleTransaction<Movie>)> {
    let current = register
        .get_element_by_id(id)
        .ok_or(CoreError::EntityNotFound { id })?;
    let mut txn = register.start_removal_transaction_for(current);
    let movie = txn.commit()?;
    Ok((movie, txn))
}

/// Builds a cast matrix from `(movie id, performer id)` pairs.
#[must_use]
pub fn cast_of(pairs: &[(u32, u32)]) -> BiMap<EntityId, EntityId> {
    pairs
        .iter()
        .map(|&(movie, performer)| (EntityId::new(movie), EntityId::new(performer)))
        .collect()
}

/// One hook invocation recorded by [`HookLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hook", content = "id", rename_all = "snake_case")]
pub enum HookCall {
    /// The save hook ran for this id.
    Save(EntityId),
    /// The delete hook ran for this id.
    Delete(EntityId),
}

/// Records save and delete hook invocations of a register.
#[derive(Debug, Clone, Default)]
pub struct HookLog {
    calls: Arc<Mutex<Vec<HookCall>>>,
}

impl HookLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs recording save and delete hooks on `register`.
    #[must_use]
    pub fn attach<T>(&self, register: Register<T>) -> Register<T>
    where
        T: Identifiable + Clone + 'static,
    {
        let saves = Arc::clone(&self.calls);
        let deletes = Arc::clone(&self.calls);
        register
            .on_save(move |element: &T| {
                saves.lock().push(HookCall::Save(element.id()));
                Ok(())
            })
            .on_delete(move |element: &T| {
                deletes.lock().push(HookCall::Delete(element.id()));
                Ok(())
            })
    }

    /// Returns and clears the recorded calls.
    pub fn take(&self) -> Vec<HookCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().clone()
    }
}
