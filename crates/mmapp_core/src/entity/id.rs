//! Entity identifier.

use std::fmt;

/// Identifier of an entity held in a [`Register`](crate::Register).
///
/// Entity IDs are dense, non-negative slot indices:
/// - Unique among the live elements of one register
/// - Immutable once assigned
/// - Reused after the owning element is removed (lowest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(pub u32);

impl EntityId {
    /// Creates an entity ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the slot index this ID addresses.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Creates an entity ID from a slot index.
    ///
    /// Returns `None` if the index does not fit in 32 bits.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Something that carries a stable [`EntityId`].
///
/// Implemented by every element type stored in a register.
pub trait Identifiable {
    /// Returns the entity's ID.
    fn id(&self) -> EntityId;
}

impl<T: Identifiable + ?Sized> Identifiable for &T {
    fn id(&self) -> EntityId {
        (**self).id()
    }
}
