//! Record-level storage helpers.
//!
//! These pair a [`Collection`] with the document visitors: records are
//! encoded through the `db` traversal on the way in and viewed strictly on
//! the way out.

use crate::collection::Collection;
use crate::error::StoreError;
use crate::filter::Filter;
use bindery_core::{Record, SchemaRegistry};
use bindery_wire::{decode_document, encode_raw};

/// A record whose storage key is known before it is encoded.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Encode and insert `record`. Returns its id.
pub fn insert_record<R: Record + Identified>(
    registry: &SchemaRegistry,
    collection: &mut Collection,
    record: &R,
) -> Result<String, StoreError> {
    ensure_id(collection, record)?;
    let doc = encode_raw(registry, record)?;
    collection.insert(doc)
}

/// Encode `record` over the stored document with the same id.
pub fn replace_record<R: Record + Identified>(
    registry: &SchemaRegistry,
    collection: &mut Collection,
    record: &R,
) -> Result<(), StoreError> {
    ensure_id(collection, record)?;
    let doc = encode_raw(registry, record)?;
    collection.replace(doc)
}

/// Replace the stored document with `record`'s id, inserting it when absent.
pub fn upsert_record<R: Record + Identified>(
    registry: &SchemaRegistry,
    collection: &mut Collection,
    record: &R,
) -> Result<(), StoreError> {
    ensure_id(collection, record)?;
    let doc = encode_raw(registry, record)?;
    if collection.get(record.id()).is_some() {
        collection.replace(doc)
    } else {
        collection.insert(doc).map(|_| ())
    }
}

/// View the document stored under `id`.
pub fn get_record<R: Record>(
    registry: &SchemaRegistry,
    collection: &Collection,
    id: &str,
) -> Result<R, StoreError> {
    let doc = collection.get(id).ok_or_else(|| StoreError::NotFound {
        collection: collection.name().to_string(),
        id: id.to_string(),
    })?;
    Ok(decode_document(registry, doc)?)
}

/// View the first document matching `filter`, if any.
pub fn find_record<R: Record>(
    registry: &SchemaRegistry,
    collection: &Collection,
    filter: &Filter,
) -> Result<Option<R>, StoreError> {
    collection
        .find_one(filter)
        .map(|doc| decode_document(registry, doc))
        .transpose()
        .map_err(StoreError::from)
}

/// View every document matching `filter`, in id order.
pub fn find_records<R: Record>(
    registry: &SchemaRegistry,
    collection: &Collection,
    filter: &Filter,
) -> Result<Vec<R>, StoreError> {
    collection
        .find(filter)
        .into_iter()
        .map(|doc| decode_document(registry, doc).map_err(StoreError::from))
        .collect()
}

fn ensure_id<R: Identified>(collection: &Collection, record: &R) -> Result<(), StoreError> {
    if record.id().is_empty() {
        return Err(StoreError::MissingId {
            collection: collection.name().to_string(),
        });
    }
    Ok(())
}
