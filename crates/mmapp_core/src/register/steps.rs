//! Begin and end steps of register transactions.

use super::slots::Ticket;
use super::Shared;
use crate::entity::{EntityId, Identifiable};
use crate::error::{CoreError, CoreResult};
use crate::operation::ReversibleOperation;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

fn nothing_captured() -> CoreError {
    CoreError::illegal_operation("end step never received a value")
}

/// Progress of one creation, shared by its begin and end steps.
#[derive(Debug, Default)]
pub(crate) struct Reservation {
    /// Id taken out of the free pool by [`Allocate`].
    id: Option<EntityId>,
    /// Ticket of the placement made by [`Store`].
    ticket: Option<Ticket>,
}

pub(crate) type SharedReservation = Arc<Mutex<Reservation>>;

/// Creation begin: allocates the next free id and constructs the element.
pub(crate) struct Allocate<T> {
    pub(crate) shared: Arc<Shared<T>>,
    pub(crate) reservation: SharedReservation,
}

impl<T: Identifiable + Clone> ReversibleOperation<(), T> for Allocate<T> {
    fn forward(&mut self, (): ()) -> CoreResult<T> {
        let id = self.shared.table.lock().allocate()?;
        let element = (self.shared.constructor)(id);
        if element.id() != id {
            self.shared.table.lock().unreserve(id);
            return Err(CoreError::operation_failed(format!(
                "constructor built element {} for allocated id {id}",
                element.id()
            )));
        }
        *self.reservation.lock() = Reservation {
            id: Some(id),
            ticket: None,
        };
        debug!(%id, "allocated id");
        Ok(element)
    }

    fn backward(&mut self, element: T) -> CoreResult<()> {
        let id = element.id();
        let ticket = std::mem::take(&mut *self.reservation.lock()).ticket;
        let mut table = self.shared.table.lock();
        if ticket.is_some() && table.ticket(id) == ticket {
            table.release(id);
            debug!(%id, "released id");
        } else {
            warn!(%id, "creation rollback left the id to a newer element");
        }
        Ok(())
    }
}

/// How an end step writes the element into the table.
#[derive(Debug)]
pub(crate) enum StoreMode {
    /// Fill the slot reserved by [`Allocate`].
    Insert(SharedReservation),
    /// Overwrite the element already occupying the slot.
    Replace,
}

/// Creation and update end: writes the element back and saves it.
pub(crate) struct Store<T> {
    pub(crate) shared: Arc<Shared<T>>,
    pub(crate) mode: StoreMode,
    pub(crate) committed: Option<T>,
}

impl<T: Identifiable + Clone> ReversibleOperation<T, ()> for Store<T> {
    fn forward(&mut self, element: T) -> CoreResult<()> {
        {
            let mut table = self.shared.table.lock();
            match &self.mode {
                StoreMode::Insert(reservation) => {
                    let ticket = table.place(element.clone())?;
                    reservation.lock().ticket = Some(ticket);
                }
                StoreMode::Replace => {
                    table.replace(element.clone())?;
                }
            }
        }
        let saved = self.shared.save(&element);
        self.committed = Some(element);
        saved
    }

    /// Hands back the stored element.
    ///
    /// A creation whose commit failed before anything was stored still holds
    /// its reserved id; that id goes back to the free pool here and the
    /// rollback reports that nothing was stored.
    fn backward(&mut self, (): ()) -> CoreResult<T> {
        if let Some(element) = self.committed.take() {
            return Ok(element);
        }
        if let StoreMode::Insert(reservation) = &self.mode {
            let pending = {
                let mut reservation = reservation.lock();
                if reservation.ticket.is_none() {
                    reservation.id.take()
                } else {
                    None
                }
            };
            if let Some(id) = pending {
                if self.shared.table.lock().unreserve(id) {
                    debug!(%id, "released id of a creation that never stored");
                }
            }
        }
        Err(nothing_captured())
    }
}

/// Update begin: hands out the element, and puts it back on rollback.
pub(crate) struct Checkout<T> {
    pub(crate) shared: Arc<Shared<T>>,
    pub(crate) element: Option<T>,
}

impl<T: Identifiable + Clone> ReversibleOperation<(), T> for Checkout<T> {
    fn forward(&mut self, (): ()) -> CoreResult<T> {
        self.element
            .take()
            .ok_or_else(|| CoreError::illegal_operation("element already checked out"))
    }

    fn backward(&mut self, element: T) -> CoreResult<()> {
        self.shared.table.lock().restore(element.clone(), None);
        debug!(id = %element.id(), "restored element after update rollback");
        self.shared.save(&element)
    }
}

/// Removal begin: frees the id, vacates the slot and deletes the element.
pub(crate) struct Detach<T> {
    pub(crate) shared: Arc<Shared<T>>,
    pub(crate) element: Option<T>,
    pub(crate) ticket: Option<Ticket>,
}

impl<T: Identifiable + Clone> ReversibleOperation<(), T> for Detach<T> {
    fn forward(&mut self, (): ()) -> CoreResult<T> {
        let element = self
            .element
            .take()
            .ok_or_else(|| CoreError::illegal_operation("element already detached"))?;
        let id = element.id();
        {
            let mut table = self.shared.table.lock();
            if !table.is_occupied(id) {
                return Err(CoreError::EntityNotFound { id });
            }
            self.ticket = table.ticket(id);
            table.release(id);
        }
        debug!(%id, "removed element");
        self.shared.delete(&element)?;
        Ok(element)
    }

    fn backward(&mut self, element: T) -> CoreResult<()> {
        let id = element.id();
        let displaced = self
            .shared
            .table
            .lock()
            .restore(element.clone(), self.ticket.take());
        if displaced.is_some() {
            warn!(%id, "removal rollback overwrote an element created in the meantime");
        }
        debug!(%id, "restored element after removal rollback");
        self.shared.save(&element)
    }
}

/// Removal end: only remembers the removed element for rollback.
pub(crate) struct Capture<T> {
    pub(crate) committed: Option<T>,
}

impl<T> ReversibleOperation<T, ()> for Capture<T> {
    fn forward(&mut self, element: T) -> CoreResult<()> {
        self.committed = Some(element);
        Ok(())
    }

    fn backward(&mut self, (): ()) -> CoreResult<T> {
        self.committed.take().ok_or_else(nothing_captured)
    }
}
