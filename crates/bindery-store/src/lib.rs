//! # bindery-store
//!
//! Document storage for bound records.
//!
//! This crate provides:
//! - `Collection` (raw BSON documents keyed by `_id`) and `Filter` queries
//! - `DocumentStore` (named collections, one file per collection)
//! - lock-scoped `mutate_store` for command-line writers
//! - typed helpers that encode and view records through the document visitors
//!
//! ## Data model
//!
//! ```text
//! <dir>/<name>.bson (concatenated BSON documents)
//!     ↕  open / save
//! DocumentStore ── Collection ── RawDocumentBuf
//!     ↕  insert_record / get_record
//! Record (through the `db` traversal)
//! ```

pub mod collection;
pub mod error;
pub mod filter;
pub mod persist;
pub mod store;
pub mod typed;

pub use collection::Collection;
pub use error::StoreError;
pub use filter::{Condition, Filter, Op};
pub use persist::{read_documents, read_documents_from_path, write_documents_to_path};
pub use store::{COLLECTION_EXTENSION, DocumentStore, LOCK_FILE, StoreLock, mutate_store};
pub use typed::{
    Identified, find_record, find_records, get_record, insert_record, replace_record,
    upsert_record,
};
