//! # otds-db
//!
//! In-memory document store built on the OT engine.
//!
//! This crate provides:
//! - Documents addressed by collection and id
//! - Submission with catch-up transforms for stale requests
//! - A committed-op log per document
//! - Presence kept in step with committed ops
//!
//! ## Example
//!
//! ```rust,ignore
//! use otds_core::{fixtures, Request};
//! use otds_db::{DocumentKey, DocumentStore, StoreConfig};
//! use otds_engine::OtEngine;
//!
//! let store = DocumentStore::new(OtEngine::new(fixtures::registry()), StoreConfig::default());
//! let key = DocumentKey::new("notes", "welcome");
//!
//! store.submit(&key, Request::create("text", Some("hi".into()))).unwrap();
//! store.submit(&key, Request::edit(fixtures::PlainText::insert(2, "!")).at_version(1)).unwrap();
//! assert_eq!(store.fetch(&key).data(), Some(&"hi!".into()));
//! ```

pub mod config;
pub mod error;
pub mod oplog;
pub mod store;

pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::{DbError, Result};
pub use oplog::CommittedOp;
pub use store::{Committed, DocumentKey, DocumentStore};
