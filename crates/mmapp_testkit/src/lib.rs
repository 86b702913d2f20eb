//! # mmapp testkit
//!
//! Test utilities for mmapp.
//!
//! This crate provides:
//! - `Movie` and `Performer` records and register fixtures
//! - Property-based test generators using proptest
//! - Golden scenarios replayed from JSON
//! - A model-checking harness for registers
//! - Stress helpers for registers shared between threads
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use mmapp_testkit::prelude::*;
//!
//! let movies = seeded_movies(&["Heat", "Ronin"]);
//! let (created, _txn) = create_movie(&movies, "Alien").unwrap();
//! assert_eq!(created.id, EntityId::new(2));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod golden;
pub mod integration;
pub mod logging;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::init_tracing;
    pub use crate::stress::*;
    pub use mmapp_core::{
        BiMap, CoreError, CoreResult, EntityId, Identifiable, Register, Transaction,
        TransactionState,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;
pub use integration::*;
pub use logging::init_tracing;
pub use stress::*;
