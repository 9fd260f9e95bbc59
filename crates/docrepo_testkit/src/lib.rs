//! # docrepo testkit
//!
//! Test utilities for docrepo.
//!
//! This crate provides:
//! - Test fixtures: an in-memory store and a sample `Person` entity
//! - A fault-injecting driver wrapper for failure-path tests
//! - Property-based test generators using proptest
//! - A model-checking harness for operation sequences
//! - Concurrent stress helpers
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust
//! use docrepo_testkit::prelude::*;
//!
//! let store = TestStore::memory();
//! let people = store.people();
//!
//! let mut frank = Person::new("Frank", 42);
//! let id = people.create(&mut frank).unwrap();
//! assert_eq!(people.find_by_id(id).unwrap(), Some(frank));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod logging;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::*;
    pub use crate::stress::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use logging::*;
pub use stress::*;
