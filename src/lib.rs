//! One-way sync of Odoo partners into a local contact store.
//!
//! A run authenticates once over JSON-RPC, fetches every partner with one
//! `search` and one `read`, then upserts each record by its Odoo id.

pub mod api;
pub mod config;
pub mod contact;
pub mod error;
pub mod job;
pub mod logging;
pub mod mapper;
pub mod reconcile;
pub mod storage;
pub mod utils;

pub use api::client::{RpcClient, Session};
pub use api::models::RawRecord;
pub use config::{ConfigFile, SyncConfig};
pub use contact::{Contact, ContactAttributes, ExternalId, SyncSummary};
pub use error::{ConfigError, JobError, MappingError, RpcError, StoreError};
pub use job::{run, run_blocking, trigger, trigger_with, JobOutcome};
pub use reconcile::Reconciler;
pub use storage::{ContactRepository, InMemoryContactStore, SqliteContactStore};
