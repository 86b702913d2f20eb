//! Slot table and free-id pool backing a register.

use crate::config::{DuplicateIdPolicy, RegisterConfig};
use crate::entity::{EntityId, Identifiable};
use crate::error::{CoreError, CoreResult};
use std::collections::BTreeSet;
use tracing::warn;

/// Stamp identifying one placement of an element into a slot.
///
/// Every [`place`](SlotTable::place) issues a fresh ticket, so a later
/// element reusing the same id can be told apart from the one placed first.
pub(crate) type Ticket = u64;

/// Dense id-indexed slots plus the set of vacant ids.
///
/// Outside an in-flight creation, `free` holds exactly the indices whose
/// slot is `None`. [`allocate`](Self::allocate) reserves an id by taking it
/// out of the pool while its slot stays empty until
/// [`place`](Self::place) fills it.
#[derive(Debug)]
pub(crate) struct SlotTable<T> {
    slots: Vec<Option<T>>,
    tickets: Vec<Ticket>,
    free: BTreeSet<EntityId>,
    next_ticket: Ticket,
    max_slots: Option<usize>,
}

impl<T: Identifiable> SlotTable<T> {
    pub(crate) fn with_config(config: &RegisterConfig) -> Self {
        Self {
            slots: Vec::with_capacity(config.initial_capacity),
            tickets: Vec::with_capacity(config.initial_capacity),
            free: BTreeSet::new(),
            next_ticket: 1,
            max_slots: config.max_slots,
        }
    }

    /// Builds a table from existing elements.
    ///
    /// The table is sized to `max id + 1`; every id below that which no
    /// element claims is free. Ids at or beyond the configured slot limit
    /// are rejected before anything is allocated for them.
    pub(crate) fn seed<I>(elements: I, config: &RegisterConfig) -> CoreResult<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut table = Self::with_config(config);
        for element in elements {
            let id = element.id();
            table.check_limit(id)?;
            let index = id.index();
            if index >= table.slots.len() {
                table.slots.resize_with(index + 1, || None);
                table.tickets.resize(index + 1, 0);
            }
            if table.slots[index].is_some() {
                match config.duplicate_ids {
                    DuplicateIdPolicy::Reject => return Err(CoreError::DuplicateId { id }),
                    DuplicateIdPolicy::LastWins => {
                        warn!(%id, "duplicate id in seed data, keeping the last");
                    }
                }
            }
            table.slots[index] = Some(element);
        }
        table.free = table
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .filter_map(|(index, _)| EntityId::from_index(index))
            .collect();
        Ok(table)
    }

    fn check_limit(&self, id: EntityId) -> CoreResult<()> {
        match self.max_slots {
            Some(limit) if id.index() >= limit => Err(CoreError::SlotLimitExceeded { id, limit }),
            _ => Ok(()),
        }
    }

    /// Reserves the lowest free id, or appends a new slot.
    pub(crate) fn allocate(&mut self) -> CoreResult<EntityId> {
        if let Some(id) = self.free.pop_first() {
            return Ok(id);
        }
        let id = EntityId::from_index(self.slots.len())
            .ok_or_else(|| CoreError::operation_failed("register id space exhausted"))?;
        self.check_limit(id)?;
        self.slots.push(None);
        self.tickets.push(0);
        Ok(id)
    }

    /// Fills a reserved slot and returns the ticket of this placement.
    pub(crate) fn place(&mut self, element: T) -> CoreResult<Ticket> {
        let id = element.id();
        let index = id.index();
        match self.slots.get_mut(index) {
            Some(slot) => {
                self.free.remove(&id);
                *slot = Some(element);
                let ticket = self.next_ticket;
                self.next_ticket += 1;
                self.tickets[index] = ticket;
                Ok(ticket)
            }
            None => Err(CoreError::illegal_operation(format!(
                "id {id} was never allocated"
            ))),
        }
    }

    /// Replaces the element occupying `element`'s id.
    ///
    /// The slot keeps its ticket.
    pub(crate) fn replace(&mut self, element: T) -> CoreResult<T> {
        let id = element.id();
        match self.slots.get_mut(id.index()) {
            Some(Some(current)) => Ok(std::mem::replace(current, element)),
            _ => Err(CoreError::EntityNotFound { id }),
        }
    }

    /// Vacates `id` and returns it to the free pool.
    ///
    /// Returns the element that occupied the slot, if any.
    pub(crate) fn release(&mut self, id: EntityId) -> Option<T> {
        let slot = self.slots.get_mut(id.index())?;
        let previous = slot.take();
        self.free.insert(id);
        previous
    }

    /// Returns a reserved but never placed id to the free pool.
    ///
    /// Does nothing unless the slot is vacant and the id is held out of the
    /// pool. Returns true if the id was returned.
    pub(crate) fn unreserve(&mut self, id: EntityId) -> bool {
        let reserved = matches!(self.slots.get(id.index()), Some(None)) && !self.free.contains(&id);
        if reserved {
            self.free.insert(id);
        }
        reserved
    }

    /// Puts `element` back at its id and takes the id out of the free pool.
    ///
    /// Whatever occupies the slot is overwritten and returned. With a
    /// `ticket` the slot takes it over; without one it keeps its own.
    pub(crate) fn restore(&mut self, element: T, ticket: Option<Ticket>) -> Option<T> {
        let id = element.id();
        let index = id.index();
        while self.slots.len() <= index {
            if let Some(vacant) = EntityId::from_index(self.slots.len()) {
                self.free.insert(vacant);
            }
            self.slots.push(None);
            self.tickets.push(0);
        }
        self.free.remove(&id);
        if let Some(ticket) = ticket {
            self.tickets[index] = ticket;
        }
        self.slots[index].replace(element)
    }

    /// Returns the ticket of the last placement at `id`.
    pub(crate) fn ticket(&self, id: EntityId) -> Option<Ticket> {
        self.tickets.get(id.index()).copied()
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn is_occupied(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn elements(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    pub(crate) fn used(&self) -> usize {
        self.elements().count()
    }

    pub(crate) fn free_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.free.iter().copied()
    }
}

impl<T> SlotTable<T> {
    pub(crate) fn free(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(u32, &'static str);

    impl Identifiable for Item {
        fn id(&self) -> EntityId {
            EntityId::new(self.0)
        }
    }

    fn seed(items: Vec<Item>, policy: DuplicateIdPolicy) -> CoreResult<SlotTable<Item>> {
        SlotTable::seed(items, &RegisterConfig::new().duplicate_ids(policy))
    }

    #[test]
    fn allocate_appends_when_pool_empty() {
        let mut table: SlotTable<Item> = SlotTable::with_config(&RegisterConfig::default());
        assert_eq!(table.allocate().unwrap(), EntityId::new(0));
        assert_eq!(table.allocate().unwrap(), EntityId::new(1));
        assert_eq!(table.slot_count(), 2);
        // Reserved but not yet placed.
        assert_eq!(table.used(), 0);
        assert_eq!(table.free(), 0);
    }

    #[test]
    fn allocate_prefers_lowest_free_id() {
        let items = vec![Item(0, "a"), Item(1, "b"), Item(2, "c"), Item(3, "d")];
        let mut table = seed(items, DuplicateIdPolicy::Reject).unwrap();
        table.release(EntityId::new(3));
        table.release(EntityId::new(1));

        assert_eq!(table.allocate().unwrap(), EntityId::new(1));
        assert_eq!(table.allocate().unwrap(), EntityId::new(3));
        assert_eq!(table.allocate().unwrap(), EntityId::new(4));
    }

    #[test]
    fn seed_marks_gaps_free() {
        let table = seed(vec![Item(4, "e"), Item(1, "b")], DuplicateIdPolicy::Reject).unwrap();

        assert_eq!(table.slot_count(), 5);
        assert_eq!(table.used(), 2);
        let free: Vec<_> = table.free_ids().map(EntityId::as_u32).collect();
        assert_eq!(free, vec![0, 2, 3]);
    }

    #[test]
    fn seed_rejects_duplicates() {
        let err = seed(vec![Item(1, "b"), Item(1, "B")], DuplicateIdPolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            CoreError::DuplicateId {
                id: EntityId::new(1)
            }
        );
    }

    #[test]
    fn seed_last_write_wins_when_allowed() {
        let table = seed(vec![Item(1, "b"), Item(1, "B")], DuplicateIdPolicy::LastWins).unwrap();
        assert_eq!(table.get(EntityId::new(1)), Some(&Item(1, "B")));
        assert_eq!(table.used(), 1);
    }

    #[test]
    fn release_and_restore_are_inverse() {
        let mut table = seed(vec![Item(0, "a"), Item(1, "b")], DuplicateIdPolicy::Reject).unwrap();

        let removed = table.release(EntityId::new(0)).unwrap();
        assert_eq!(table.free(), 1);
        assert!(!table.is_occupied(EntityId::new(0)));

        assert!(table.restore(removed, None).is_none());
        assert_eq!(table.free(), 0);
        assert_eq!(table.get(EntityId::new(0)), Some(&Item(0, "a")));
    }

    #[test]
    fn restore_beyond_end_grows_with_free_gaps() {
        let mut table: SlotTable<Item> = SlotTable::with_config(&RegisterConfig::default());
        table.restore(Item(2, "c"), None);
        assert_eq!(table.slot_count(), 3);
        let free: Vec<_> = table.free_ids().map(EntityId::as_u32).collect();
        assert_eq!(free, vec![0, 1]);
    }

    #[test]
    fn replace_requires_occupied_slot() {
        let mut table = seed(vec![Item(0, "a")], DuplicateIdPolicy::Reject).unwrap();
        assert_eq!(table.replace(Item(0, "A")).unwrap(), Item(0, "a"));
        assert_eq!(
            table.replace(Item(5, "x")).unwrap_err(),
            CoreError::EntityNotFound {
                id: EntityId::new(5)
            }
        );
    }

    #[test]
    fn get_out_of_range_is_none() {
        let table: SlotTable<Item> = SlotTable::with_config(&RegisterConfig::default());
        assert!(table.get(EntityId::new(99)).is_none());
    }

    #[test]
    fn unreserve_only_touches_reserved_ids() {
        let mut table = seed(vec![Item(0, "a")], DuplicateIdPolicy::Reject).unwrap();
        let reserved = table.allocate().unwrap();

        assert!(!table.unreserve(EntityId::new(0)));
        assert!(table.unreserve(reserved));
        assert!(!table.unreserve(reserved));
        assert_eq!(table.free_ids().collect::<Vec<_>>(), vec![reserved]);
    }

    #[test]
    fn placements_get_distinct_tickets() {
        let mut table: SlotTable<Item> = SlotTable::with_config(&RegisterConfig::default());
        let id = table.allocate().unwrap();
        let first = table.place(Item(0, "a")).unwrap();
        table.release(id);

        table.allocate().unwrap();
        let second = table.place(Item(0, "b")).unwrap();
        assert_ne!(first, second);
        assert_eq!(table.ticket(id), Some(second));

        table.restore(Item(0, "a"), Some(first));
        assert_eq!(table.ticket(id), Some(first));
    }

    #[test]
    fn slot_limit_bounds_seed_and_allocation() {
        let config = RegisterConfig::new().max_slots(2);
        let err = SlotTable::seed(vec![Item(5, "f")], &config).unwrap_err();
        assert_eq!(
            err,
            CoreError::SlotLimitExceeded {
                id: EntityId::new(5),
                limit: 2
            }
        );

        let mut table = SlotTable::seed(vec![Item(1, "b")], &config).unwrap();
        assert_eq!(table.allocate().unwrap(), EntityId::new(0));
        assert!(matches!(
            table.allocate().unwrap_err(),
            CoreError::SlotLimitExceeded { .. }
        ));
    }
}
