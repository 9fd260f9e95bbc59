//! # docrepo document
//!
//! Document value model for docrepo.
//!
//! Documents are the unit the store persists: a flat, ordered map of
//! field names to [`Value`]s, identified by an [`ObjectId`] stored under
//! the `_id` field. The store treats them as opaque; this crate only
//! provides enough structure for the repository engine to map records
//! in and out and for filters to compare fields.
//!
//! ## Usage
//!
//! ```
//! use docrepo_document::{doc, ObjectId, Value};
//!
//! let mut person = doc! { "name" => "Frank", "age" => 42 };
//! person.insert("_id", ObjectId::new());
//!
//! assert!(person.id().is_some());
//! assert_eq!(person.get("age"), Some(&Value::Integer(42)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bridge;
mod document;
mod error;
mod oid;
mod value;

pub use bridge::{from_document, to_document};
pub use document::{Document, ID_FIELD};
pub use error::{DocumentError, DocumentResult};
pub use oid::ObjectId;
pub use value::Value;
