//! Request handlers.
//!
//! A handler declares an argument record (bound from request parameters)
//! and an output record (rendered as the JSON response). The surrounding
//! exchange in [`crate::app`] establishes the session before `run` and
//! saves it after.

use crate::error::AppError;
use crate::records::Session;
use bindery_core::{Record, SchemaError, SchemaRegistry};
use bindery_store::{
    DocumentStore, Filter, Identified, StoreError, find_record, get_record, insert_record,
    replace_record,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

pub mod book;
pub mod buy;
pub mod cat;
pub mod login;

pub use book::{BookArgs, BookHandler};
pub use buy::{BuyArgs, BuyHandler, BuyResult};
pub use cat::{CatArgs, CatHandler, CatPage};
pub use login::{LoginArgs, LoginHandler, LoginResult};

pub trait Handler {
    const ROUTE: &'static str;
    type Args: Record;
    type Output: Record;

    fn run(ctx: &mut Context<'_>, args: Self::Args) -> Result<Self::Output, AppError>;

    /// Describe the argument and output records.
    fn register(registry: &SchemaRegistry) -> Result<(), SchemaError> {
        registry.register::<Self::Args>()?;
        registry.register::<Self::Output>()
    }
}

/// What a handler may touch during one request.
pub struct Context<'a> {
    registry: &'a SchemaRegistry,
    store: &'a mut DocumentStore,
    session: &'a mut Session,
    now: DateTime<Utc>,
    dirty: BTreeSet<String>,
}

impl<'a> Context<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        store: &'a mut DocumentStore,
        session: &'a mut Session,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            registry,
            store,
            session,
            now,
            dirty: BTreeSet::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    pub fn get<R: Record>(&self, collection: &str, id: &str) -> Result<R, AppError> {
        let Some(docs) = self.store.collection(collection) else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }
            .into());
        };
        Ok(get_record(self.registry, docs, id)?)
    }

    pub fn find<R: Record>(&self, collection: &str, filter: &Filter) -> Result<Option<R>, AppError> {
        match self.store.collection(collection) {
            Some(docs) => Ok(find_record(self.registry, docs, filter)?),
            None => Ok(None),
        }
    }

    pub fn count(&self, collection: &str, filter: &Filter) -> usize {
        self.store
            .collection(collection)
            .map_or(0, |docs| docs.find(filter).len())
    }

    pub fn insert<R: Record + Identified>(
        &mut self,
        collection: &str,
        record: &R,
    ) -> Result<String, AppError> {
        let id = insert_record(self.registry, self.store.collection_mut(collection), record)?;
        self.dirty.insert(collection.to_string());
        Ok(id)
    }

    pub fn replace<R: Record + Identified>(
        &mut self,
        collection: &str,
        record: &R,
    ) -> Result<(), AppError> {
        replace_record(self.registry, self.store.collection_mut(collection), record)?;
        self.dirty.insert(collection.to_string());
        Ok(())
    }

    /// Collections written during the request.
    pub fn into_dirty(self) -> BTreeSet<String> {
        self.dirty
    }
}
