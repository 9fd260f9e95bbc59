//! # docrepo core
//!
//! Transactional repository engine for document stores.
//!
//! This crate provides:
//! - [`Entity`] and [`EntityDescriptor`]: static binding of a record type
//!   to its collection
//! - [`Repository`]: generic CRUD where every operation runs in a
//!   transaction scope
//! - [`TransactionScope`] and [`SessionContext`]: owner-or-join
//!   transaction bracketing over a chain-local current session
//! - [`RepositoryRegistry`]: one lazily built instance per repository type
//! - [`Database`] and [`Config`]: wiring a driver client to all of the above
//!
//! ## Transactions
//!
//! The first repository operation on a call chain that finds no open
//! transaction starts one and owns it. Every operation reached from inside
//! it, directly or through [`Database::transaction`], joins that same
//! session. Only the owner commits or aborts, so callers never observe a
//! partially committed unit of work.
//!
//! ```rust
//! use docrepo_core::{impl_serde_entity, CoreResult, Database, ObjectId, Repository};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Person {
//!     #[serde(skip)]
//!     id: Option<ObjectId>,
//!     name: String,
//! }
//!
//! impl_serde_entity!(Person, "people", id);
//!
//! let db = Database::open_in_memory("app");
//! let people = db.repository::<Repository<Person>>().unwrap();
//!
//! let mut frank = Person { id: None, name: "Frank".into() };
//! let id = people.create(&mut frank).unwrap();
//!
//! let result: CoreResult<()> = db.transaction(|| {
//!     frank.name = "Frank Updated".into();
//!     people.update(&frank)?;
//!     Err(docrepo_core::CoreError::config("changed my mind"))
//! });
//! assert!(result.is_err());
//! assert_eq!(people.find_by_id(id).unwrap().unwrap().name, "Frank");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod database;
pub mod entity;
mod error;
mod registry;
mod repository;
mod scope;

pub use config::{Config, ENV_PREFIX};
pub use context::{SessionContext, SessionHandle};
pub use database::Database;
pub use entity::{validate_collection_name, Entity, EntityDescriptor};
pub use error::{CoreError, CoreResult};
pub use registry::RepositoryRegistry;
pub use repository::{Operation, Repository, RepositoryType};
pub use scope::{Outcome, TransactionScope};

pub use docrepo_document::{doc, Document, ObjectId, Value};
pub use docrepo_driver::{ClientId, Filter};
