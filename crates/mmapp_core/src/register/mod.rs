//! Id-allocating entity register.
//!
//! A [`Register`] keeps identifiable elements in dense slots indexed by
//! their id and hands out ids lowest-free-first. Every change goes through
//! a [`ReversibleTransaction`], so creating, updating and removing elements
//! can all be undone after commit.

mod slots;
mod steps;

use crate::config::RegisterConfig;
use crate::entity::{EntityId, Identifiable};
use crate::error::CoreResult;
use crate::transaction::ReversibleTransaction;
use parking_lot::{Mutex, RwLock};
use slots::SlotTable;
use std::fmt;
use std::sync::Arc;
use steps::{Allocate, Capture, Checkout, Detach, Reservation, Store, StoreMode};

/// Side-effect hook run with the element being saved or deleted.
type Hook<T> = Arc<dyn Fn(&T) -> CoreResult<()> + Send + Sync>;

/// Builds a fresh element for a newly allocated id.
type Constructor<T> = Arc<dyn Fn(EntityId) -> T + Send + Sync>;

struct Hooks<T> {
    save: Option<Hook<T>>,
    delete: Option<Hook<T>>,
}

/// State shared between a register and the transactions it starts.
pub(crate) struct Shared<T> {
    table: Mutex<SlotTable<T>>,
    constructor: Constructor<T>,
    hooks: RwLock<Hooks<T>>,
}

impl<T> Shared<T> {
    /// Runs the save hook. No lock is held while it runs.
    fn save(&self, element: &T) -> CoreResult<()> {
        let hook = self.hooks.read().save.clone();
        match hook {
            Some(hook) => hook(element),
            None => Ok(()),
        }
    }

    /// Runs the delete hook. No lock is held while it runs.
    fn delete(&self, element: &T) -> CoreResult<()> {
        let hook = self.hooks.read().delete.clone();
        match hook {
            Some(hook) => hook(element),
            None => Ok(()),
        }
    }
}

/// An id-indexed table of elements driven by reversible transactions.
///
/// `Register` is a cheap handle: clones share the same table. Save and
/// delete hooks connect it to a persistence layer; they run synchronously
/// inside transaction steps and their errors propagate out of commit and
/// rollback.
///
/// # Example
///
/// ```
/// use mmapp_core::{EntityId, Identifiable, Register, Transaction};
///
/// #[derive(Clone)]
/// struct Movie {
///     id: EntityId,
///     title: String,
/// }
///
/// impl Identifiable for Movie {
///     fn id(&self) -> EntityId {
///         self.id
///     }
/// }
///
/// let movies = Register::new(|id| Movie { id, title: String::new() });
///
/// let mut create = movies.start_creation_transaction();
/// let movie = create.commit().unwrap();
/// assert_eq!(movie.id, EntityId::new(0));
///
/// create.rollback().unwrap();
/// assert!(movies.get_element_by_id(EntityId::new(0)).is_none());
/// ```
pub struct Register<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Register<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Identifiable + Clone + 'static> Register<T> {
    /// Creates an empty register.
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(EntityId) -> T + Send + Sync + 'static,
    {
        Self::with_config(constructor, RegisterConfig::default())
    }

    /// Creates an empty register with the given configuration.
    pub fn with_config<F>(constructor: F, config: RegisterConfig) -> Self
    where
        F: Fn(EntityId) -> T + Send + Sync + 'static,
    {
        Self::from_table(constructor, SlotTable::with_config(&config))
    }

    /// Creates a register holding existing elements.
    ///
    /// The slot table is sized to the highest id plus one and every id below
    /// that without an element is free. Repeated ids are handled according to
    /// [`RegisterConfig::duplicate_ids`].
    ///
    /// A single element with a very large id allocates every slot below it.
    /// Set [`RegisterConfig::max_slots`] when seed data is untrusted; ids at or
    /// beyond the limit fail with
    /// [`CoreError::SlotLimitExceeded`](crate::CoreError::SlotLimitExceeded).
    pub fn from_elements<F, I>(
        constructor: F,
        elements: I,
        config: RegisterConfig,
    ) -> CoreResult<Self>
    where
        F: Fn(EntityId) -> T + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        let table = SlotTable::seed(elements, &config)?;
        Ok(Self::from_table(constructor, table))
    }

    fn from_table<F>(constructor: F, table: SlotTable<T>) -> Self
    where
        F: Fn(EntityId) -> T + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(table),
                constructor: Arc::new(constructor),
                hooks: RwLock::new(Hooks {
                    save: None,
                    delete: None,
                }),
            }),
        }
    }

    /// Sets the hook run whenever an element is stored or restored.
    #[must_use]
    pub fn on_save<F>(self, hook: F) -> Self
    where
        F: Fn(&T) -> CoreResult<()> + Send + Sync + 'static,
    {
        self.shared.hooks.write().save = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run whenever an element is removed.
    #[must_use]
    pub fn on_delete<F>(self, hook: F) -> Self
    where
        F: Fn(&T) -> CoreResult<()> + Send + Sync + 'static,
    {
        self.shared.hooks.write().delete = Some(Arc::new(hook));
        self
    }

    /// Starts a transaction that creates a new element.
    ///
    /// Commit allocates the lowest free id, constructs the element, stores it
    /// and runs the save hook, then returns the element. Rollback frees the
    /// id again without running the delete hook.
    ///
    /// If the element was removed and its id handed to a newer element in
    /// the meantime, rollback leaves the newer element in place. If commit
    /// failed before the element was stored, rollback returns the reserved
    /// id to the free pool and then fails, since there is nothing to unwind.
    #[must_use]
    pub fn start_creation_transaction(&self) -> ReversibleTransaction<T> {
        let reservation = Arc::new(Mutex::new(Reservation::default()));
        ReversibleTransaction::new(
            Allocate {
                shared: Arc::clone(&self.shared),
                reservation: Arc::clone(&reservation),
            },
            Store {
                shared: Arc::clone(&self.shared),
                mode: StoreMode::Insert(reservation),
                committed: None,
            },
        )
    }

    /// Starts a transaction that edits `element`.
    ///
    /// Staged transformations mutate the element; commit writes the result
    /// back and runs the save hook. Commit fails with
    /// [`CoreError::EntityNotFound`](crate::CoreError::EntityNotFound) if the
    /// element's id is vacant by then. Rollback restores the pre-update
    /// element and saves it again.
    #[must_use]
    pub fn start_update_transaction_for(&self, element: T) -> ReversibleTransaction<T> {
        ReversibleTransaction::new(
            Checkout {
                shared: Arc::clone(&self.shared),
                element: Some(element),
            },
            Store {
                shared: Arc::clone(&self.shared),
                mode: StoreMode::Replace,
                committed: None,
            },
        )
    }

    /// Starts a transaction that removes `element`.
    ///
    /// Commit vacates the slot, frees the id and runs the delete hook.
    /// Rollback puts the element back at its id, takes the id out of the free
    /// pool and runs the save hook. An element that took over the id in the
    /// meantime is overwritten.
    #[must_use]
    pub fn start_removal_transaction_for(&self, element: T) -> ReversibleTransaction<T> {
        ReversibleTransaction::new(
            Detach {
                shared: Arc::clone(&self.shared),
                element: Some(element),
                ticket: None,
            },
            Capture { committed: None },
        )
    }

    /// Returns the element stored at `id`, if any.
    ///
    /// Out-of-range ids are simply absent.
    #[must_use]
    pub fn get_element_by_id(&self, id: EntityId) -> Option<T> {
        self.shared.table.lock().get(id).cloned()
    }

    /// Returns true if an element occupies `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.shared.table.lock().is_occupied(id)
    }

    /// Returns a snapshot of all elements in id order.
    #[must_use]
    pub fn elements(&self) -> Vec<T> {
        self.shared.table.lock().elements().cloned().collect()
    }

    /// Returns the number of stored elements.
    #[must_use]
    pub fn used_space(&self) -> usize {
        self.shared.table.lock().used()
    }

    /// Returns the number of free ids below [`slot_count`](Self::slot_count).
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.shared.table.lock().free()
    }

    /// Returns the free ids in ascending order.
    #[must_use]
    pub fn free_ids(&self) -> Vec<EntityId> {
        self.shared.table.lock().free_ids().collect()
    }

    /// Returns the size of the slot table.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.shared.table.lock().slot_count()
    }

    /// Returns true if no element is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_space() == 0
    }
}

impl<T> fmt::Debug for Register<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.shared.table.lock();
        f.debug_struct("Register")
            .field("slots", &table.slot_count())
            .field("free", &table.free())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateIdPolicy;
    use crate::error::CoreError;
    use crate::operation::FieldUpdate;
    use crate::transaction::Transaction;

    #[derive(Debug, Clone, PartialEq)]
    struct Movie {
        id: EntityId,
        title: String,
        rating: u8,
    }

    impl Identifiable for Movie {
        fn id(&self) -> EntityId {
            self.id
        }
    }

    fn untitled(id: EntityId) -> Movie {
        Movie {
            id,
            title: String::new(),
            rating: 0,
        }
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    fn create_register() -> (Register<Movie>, Journal) {
        let journal = Journal::default();
        let saves = Arc::clone(&journal);
        let deletes = Arc::clone(&journal);
        let register = Register::new(untitled)
            .on_save(move |m: &Movie| {
                saves.lock().push(format!("save {} {}", m.id, m.title));
                Ok(())
            })
            .on_delete(move |m: &Movie| {
                deletes.lock().push(format!("delete {}", m.id));
                Ok(())
            });
        (register, journal)
    }

    fn create(register: &Register<Movie>) -> Movie {
        register.start_creation_transaction().commit().unwrap()
    }

    fn retitle(title: &str) -> impl crate::ReversibleOperation<Movie, Movie> {
        FieldUpdate::new(
            title.to_string(),
            |m: &Movie| m.title.clone(),
            |m: &mut Movie, v: String| m.title = v,
        )
    }

    #[test]
    fn creation_allocates_sequential_ids() {
        let (register, journal) = create_register();
        let a = create(&register);
        let b = create(&register);

        assert_eq!(a.id, EntityId::new(0));
        assert_eq!(b.id, EntityId::new(1));
        assert_eq!(register.used_space(), 2);
        assert_eq!(register.free_space(), 0);
        assert_eq!(*journal.lock(), vec!["save #0 ", "save #1 "]);
    }

    #[test]
    fn creation_with_staged_fields() {
        let (register, journal) = create_register();
        let mut txn = register.start_creation_transaction();
        txn.stage(retitle("Heat")).unwrap();
        let movie = txn.commit().unwrap();

        assert_eq!(movie.title, "Heat");
        assert_eq!(register.get_element_by_id(movie.id), Some(movie));
        assert_eq!(*journal.lock(), vec!["save #0 Heat"]);
    }

    #[test]
    fn creation_rollback_frees_id_without_delete() {
        let (register, journal) = create_register();
        let mut txn = register.start_creation_transaction();
        let movie = txn.commit().unwrap();

        txn.rollback().unwrap();

        assert!(register.get_element_by_id(movie.id).is_none());
        assert_eq!(register.used_space(), 0);
        assert_eq!(register.free_ids(), vec![EntityId::new(0)]);
        assert_eq!(*journal.lock(), vec!["save #0 "]);
    }

    #[test]
    fn aborted_creation_allocates_nothing() {
        let (register, journal) = create_register();
        let mut txn = register.start_creation_transaction();
        txn.abort().unwrap();

        assert_eq!(register.slot_count(), 0);
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn lowest_free_id_is_reused() {
        let (register, _) = create_register();
        let _a = create(&register);
        let b = create(&register);
        let _c = create(&register);

        register
            .start_removal_transaction_for(b)
            .commit()
            .unwrap();
        let d = create(&register);

        assert_eq!(d.id, EntityId::new(1));
        assert_eq!(register.slot_count(), 3);
    }

    #[test]
    fn update_writes_back_and_rolls_back() {
        let (register, journal) = create_register();
        let movie = create(&register);
        journal.lock().clear();

        let mut txn = register.start_update_transaction_for(movie.clone());
        txn.stage(retitle("Ronin")).unwrap();
        txn.stage(FieldUpdate::new(
            4,
            |m: &Movie| m.rating,
            |m: &mut Movie, v: u8| m.rating = v,
        ))
        .unwrap();
        let updated = txn.commit().unwrap();

        assert_eq!(updated.title, "Ronin");
        assert_eq!(register.get_element_by_id(movie.id), Some(updated));

        txn.rollback().unwrap();

        assert_eq!(register.get_element_by_id(movie.id), Some(movie));
        assert_eq!(*journal.lock(), vec!["save #0 Ronin", "save #0 "]);
    }

    #[test]
    fn update_of_removed_element_fails() {
        let (register, _) = create_register();
        let movie = create(&register);
        register
            .start_removal_transaction_for(movie.clone())
            .commit()
            .unwrap();

        let mut txn = register.start_update_transaction_for(movie.clone());
        let err = txn.commit().unwrap_err();
        assert_eq!(err, CoreError::EntityNotFound { id: movie.id });
        assert!(txn.was_committed());
    }

    #[test]
    fn removal_runs_delete_and_rolls_back_with_save() {
        let (register, journal) = create_register();
        let movie = create(&register);
        journal.lock().clear();

        let mut txn = register.start_removal_transaction_for(movie.clone());
        let removed = txn.commit().unwrap();
        assert_eq!(removed, movie);
        assert!(!register.contains(movie.id));
        assert_eq!(register.free_space(), 1);

        txn.rollback().unwrap();
        assert_eq!(register.get_element_by_id(movie.id), Some(movie));
        assert_eq!(register.free_space(), 0);
        assert_eq!(*journal.lock(), vec!["delete #0", "save #0 "]);
    }

    #[test]
    fn removal_of_vacant_id_fails() {
        let (register, journal) = create_register();
        let ghost = untitled(EntityId::new(7));

        let err = register
            .start_removal_transaction_for(ghost)
            .commit()
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::EntityNotFound {
                id: EntityId::new(7)
            }
        );
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn removal_rollback_overwrites_reused_id() {
        let (register, _) = create_register();
        let a = create(&register);
        let _b = create(&register);

        let mut removal = register.start_removal_transaction_for(a.clone());
        removal.commit().unwrap();
        assert_eq!(register.used_space(), 1);
        assert_eq!(register.free_space(), 1);

        let c = create(&register);
        assert_eq!(c.id, EntityId::new(0));

        removal.rollback().unwrap();
        assert_eq!(register.used_space(), 2);
        assert_eq!(register.free_space(), 0);
        assert_eq!(register.get_element_by_id(EntityId::new(0)), Some(a));
    }

    #[test]
    fn save_failure_propagates_but_stays_reversible() {
        let register = Register::new(untitled)
            .on_save(|_: &Movie| Err(CoreError::operation_failed("disk full")));

        let mut txn = register.start_creation_transaction();
        assert_eq!(
            txn.commit().unwrap_err(),
            CoreError::operation_failed("disk full")
        );
        assert!(txn.was_committed());
        assert_eq!(register.used_space(), 1);

        txn.rollback().unwrap();
        assert_eq!(register.used_space(), 0);
        assert_eq!(register.free_space(), 1);
    }

    #[test]
    fn constructor_must_honour_allocated_id() {
        let register = Register::new(|_| untitled(EntityId::new(99)));
        let err = register.start_creation_transaction().commit().unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed { .. }));
        assert_eq!(register.free_ids(), vec![EntityId::new(0)]);
    }

    #[test]
    fn seeded_register_reuses_gaps() {
        let register = Register::from_elements(
            untitled,
            vec![untitled(EntityId::new(0)), untitled(EntityId::new(2))],
            RegisterConfig::default(),
        )
        .unwrap();

        assert_eq!(register.slot_count(), 3);
        assert_eq!(register.free_ids(), vec![EntityId::new(1)]);
        assert_eq!(create(&register).id, EntityId::new(1));
        assert_eq!(create(&register).id, EntityId::new(3));
    }

    #[test]
    fn seeded_register_duplicate_policy() {
        let seed = || {
            vec![
                Movie {
                    id: EntityId::new(1),
                    title: "first".into(),
                    rating: 0,
                },
                Movie {
                    id: EntityId::new(1),
                    title: "second".into(),
                    rating: 0,
                },
            ]
        };

        let err = Register::from_elements(untitled, seed(), RegisterConfig::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));

        let config = RegisterConfig::new().duplicate_ids(DuplicateIdPolicy::LastWins);
        let register = Register::from_elements(untitled, seed(), config).unwrap();
        let kept = register.get_element_by_id(EntityId::new(1)).unwrap();
        assert_eq!(kept.title, "second");
    }

    #[test]
    fn elements_in_id_order() {
        let (register, _) = create_register();
        for _ in 0..4 {
            create(&register);
        }
        let third = register.get_element_by_id(EntityId::new(2)).unwrap();
        register
            .start_removal_transaction_for(third)
            .commit()
            .unwrap();

        let ids: Vec<u32> = register.elements().iter().map(|m| m.id.as_u32()).collect();
        assert_eq!(ids, vec![0, 1, 3]);
    }

    #[test]
    fn clones_share_the_table() {
        let (register, _) = create_register();
        let other = register.clone();
        create(&register);
        assert_eq!(other.used_space(), 1);
    }

    #[test]
    fn out_of_range_lookup_is_none() {
        let (register, _) = create_register();
        assert!(register.get_element_by_id(EntityId::new(1_000)).is_none());
        assert!(register.is_empty());
    }

    fn failing_step() -> impl crate::ReversibleOperation<Movie, Movie> {
        crate::operation::reversible(
            |_: Movie| -> CoreResult<Movie> { Err(CoreError::operation_failed("bad title")) },
            |m: Movie| Ok(m),
        )
    }

    fn assert_pool_consistent(register: &Register<Movie>) {
        assert_eq!(
            register.slot_count(),
            register.used_space() + register.free_space()
        );
    }

    #[test]
    fn failed_creation_rollback_returns_reserved_id() {
        let (register, journal) = create_register();
        let mut txn = register.start_creation_transaction();
        txn.stage(failing_step()).unwrap();

        assert_eq!(
            txn.commit().unwrap_err(),
            CoreError::operation_failed("bad title")
        );
        assert_eq!(register.free_space(), 0);
        assert_eq!(register.slot_count(), 1);

        assert!(txn.rollback().unwrap_err().is_illegal_operation());
        assert!(txn.was_rolled_back());
        assert_eq!(register.free_ids(), vec![EntityId::new(0)]);
        assert_pool_consistent(&register);

        assert_eq!(create(&register).id, EntityId::new(0));
        assert_eq!(*journal.lock(), vec!["save #0 "]);
    }

    #[test]
    fn creation_rollback_spares_element_reusing_the_id() {
        let (register, journal) = create_register();
        let mut create_a = register.start_creation_transaction();
        let a = create_a.commit().unwrap();
        register
            .start_removal_transaction_for(a)
            .commit()
            .unwrap();

        let mut create_c = register.start_creation_transaction();
        create_c.stage(retitle("C")).unwrap();
        let c = create_c.commit().unwrap();
        assert_eq!(c.id, EntityId::new(0));
        journal.lock().clear();

        create_a.rollback().unwrap();
        assert_eq!(register.get_element_by_id(EntityId::new(0)), Some(c));
        assert!(register.free_ids().is_empty());
        assert_pool_consistent(&register);
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn creation_rollback_after_undone_removal_frees_the_id() {
        let (register, _) = create_register();
        let mut create_a = register.start_creation_transaction();
        let a = create_a.commit().unwrap();

        let mut removal = register.start_removal_transaction_for(a.clone());
        removal.commit().unwrap();
        removal.rollback().unwrap();
        assert_eq!(register.get_element_by_id(a.id), Some(a));

        create_a.rollback().unwrap();
        assert!(register.is_empty());
        assert_eq!(register.free_ids(), vec![EntityId::new(0)]);
    }

    #[test]
    fn seed_beyond_slot_limit_is_rejected() {
        let config = RegisterConfig::new().max_slots(16);
        let far = untitled(EntityId::new(u32::MAX - 1));
        let err = Register::from_elements(untitled, vec![far], config).unwrap_err();
        assert_eq!(
            err,
            CoreError::SlotLimitExceeded {
                id: EntityId::new(u32::MAX - 1),
                limit: 16
            }
        );
    }
}
