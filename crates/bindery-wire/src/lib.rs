//! # bindery-wire
//!
//! The visitors that give records a wire representation.
//!
//! This crate provides:
//! - `FormVisitor` over a `FormTree` (inbound request parameters, permissive)
//! - `JsonVisitor` (outbound JSON text)
//! - `DocumentWriter` / `DocumentReader` (BSON storage, strict on read)
//!
//! plus one-call helpers for each direction and the capability lists the
//! helpers traverse under.
//!
//! ## Data flow
//!
//! ```text
//! request params ──FormVisitor──▶ args record ──▶ handler
//! result record  ──JsonVisitor──▶ response body
//! record ──DocumentWriter──▶ bson::Document ──▶ storage
//! storage ──RawDocument──DocumentReader──▶ record
//! ```

use bindery_core::{Capability, CapabilityList};

pub mod document;
pub mod form;
pub mod json;

/// Argument binding admits only request parameters.
pub const ARGS: CapabilityList = CapabilityList::new("args", &[Capability::FormTree]);

/// Response rendering admits only JSON.
pub const JSON: CapabilityList = CapabilityList::new("json", &[Capability::Json]);

/// Storage admits both document directions.
pub const DB: CapabilityList = CapabilityList::new(
    "db",
    &[Capability::DocumentWrite, Capability::DocumentView],
);

pub use document::{
    DocumentReader, DocumentWriter, decode_document, decode_into, encode_document, encode_raw,
    tag_name, value_from_raw, value_to_bson,
};
pub use form::{FormTree, FormVisitor, bind_form, bind_form_into, percent_decode, split_key};
pub use json::{JsonVisitor, to_json_string, write_json};
