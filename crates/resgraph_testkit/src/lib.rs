//! # resgraph Testkit
//!
//! Test utilities for resgraph.
//!
//! This crate provides:
//! - Sessions over a fault-injecting in-memory datastore
//! - Builders for the reservation scenarios shared by the test suites
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use resgraph_testkit::prelude::*;
//! use resgraph_store::EntityKind;
//!
//! with_session(|ts| {
//!     ts.transaction(cascade_scenario).unwrap();
//!     assert_eq!(ts.count(EntityKind::Reservation), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
