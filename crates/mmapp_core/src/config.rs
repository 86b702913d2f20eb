//! Register configuration.

/// How a register treats seed data that repeats an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DuplicateIdPolicy {
    /// Fail with [`CoreError::DuplicateId`](crate::CoreError::DuplicateId).
    #[default]
    Reject,
    /// Keep the last element seen for the id.
    LastWins,
}

/// Configuration for building a [`Register`](crate::Register).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegisterConfig {
    /// Treatment of repeated ids in seed data.
    pub duplicate_ids: DuplicateIdPolicy,

    /// Number of slots to reserve up front.
    pub initial_capacity: usize,

    /// Upper bound on the slot table size, if any.
    ///
    /// Seeding sizes the table to the highest id plus one, so a single seed
    /// element with a huge id allocates that many slots. A limit turns that
    /// into [`CoreError::SlotLimitExceeded`](crate::CoreError::SlotLimitExceeded).
    pub max_slots: Option<usize>,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            duplicate_ids: DuplicateIdPolicy::Reject,
            initial_capacity: 0,
            max_slots: None,
        }
    }
}

impl RegisterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duplicate id policy for seed data.
    #[must_use]
    pub const fn duplicate_ids(mut self, policy: DuplicateIdPolicy) -> Self {
        self.duplicate_ids = policy;
        self
    }

    /// Sets the number of slots reserved up front.
    #[must_use]
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Caps the slot table at `limit` slots.
    #[must_use]
    pub const fn max_slots(mut self, limit: usize) -> Self {
        self.max_slots = Some(limit);
        self
    }
}
