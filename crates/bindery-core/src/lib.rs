//! # Bindery Core
//!
//! Schema-first record binding: a record type declares its fields once and
//! every wire format is derived from that single declaration.
//!
//! This crate is **format-agnostic**: it does not know what JSON, BSON, or a
//! form body looks like. It only guarantees the order and shape in which a
//! record's fields are shown to the visitors that do.
//!
//! ## Architecture
//!
//! ```text
//! Record::describe      ← (name, getter, setter) triples, once per type
//!     │
//! SchemaRegistry        ← memoized Schema<R>, shared read-only
//!     │
//! Traversal             ← walks fields in declared order
//!     │
//! ReadVisitor / WriteVisitor  ← one per wire format, admitted by a
//!                               CapabilityList
//! ```

pub mod error;
pub mod registry;
pub mod schema;
pub mod traverse;
pub mod value;
pub mod visitor;

pub use error::{SchemaError, TraverseError};
pub use registry::SchemaRegistry;
pub use schema::{
    FieldDescriptor, FieldKind, Outline, OutlineField, OutlineShape, Record, Schema,
    SchemaBuilder,
};
pub use traverse::Traversal;
pub use value::{
    FieldType, FieldValue, ScalarKind, Value, ValueRef, is_millisecond_precise, truncate_to_millis,
};
pub use visitor::{Capability, CapabilityList, ReadVisitor, ScalarSlot, WriteVisitor};
