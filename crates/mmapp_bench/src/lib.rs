//! Benchmarks for mmapp.
//!
//! The benches live in `benches/`; this crate only holds their shared
//! input generators.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
