//! # docrepo driver
//!
//! Driver interface between the repository engine and a document store.
//!
//! The engine never talks to a store directly. It goes through a
//! [`Client`] for collections and sessions, a [`Collection`] for CRUD,
//! and a [`Session`] for the transaction primitives. Drivers report
//! failures as [`DriverError`]; the engine propagates them unchanged.
//!
//! ## Design Principles
//!
//! - Collection operations take an optional session and join its
//!   transaction when one is active
//! - Sessions are owned by one call chain at a time
//! - Clients and collections are `Send + Sync` and shared freely
//!
//! ## Available Drivers
//!
//! - [`InMemoryClient`] - In-process store with transactions, for tests
//!   and embedding
//!
//! ## Example
//!
//! ```rust
//! use docrepo_document::doc;
//! use docrepo_driver::{Client, Filter, InMemoryClient};
//!
//! let client = InMemoryClient::new("app");
//! let people = client.collection("people").unwrap();
//!
//! let mut session = client.start_session().unwrap();
//! session.start_transaction().unwrap();
//! people.insert_one(doc! { "name" => "Ada" }, Some(&*session)).unwrap();
//! session.commit_transaction().unwrap();
//!
//! assert_eq!(people.find(&Filter::all(), None).unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod collection;
mod error;
mod filter;
mod memory;
mod session;

pub use client::{Client, ClientId, Connector};
pub use collection::{Collection, DeleteResult, ReplaceResult};
pub use error::{DriverError, DriverResult};
pub use filter::Filter;
pub use memory::{InMemoryClient, InMemoryCollection, InMemoryConnector, InMemorySession, URI_SCHEME};
pub use session::{Session, SessionId};
