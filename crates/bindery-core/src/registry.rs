//! Memoized schema registry.
//!
//! One registry is built during process initialization and passed by
//! reference to every traversal. Schemas are described on first use (or
//! eagerly through [`SchemaRegistry::register`]) and never mutated after.
//! Once [`SchemaRegistry::seal`] is called, describing a new type is a
//! [`SchemaError::UnknownRecord`].

use crate::error::SchemaError;
use crate::schema::{Outline, Record, Schema};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

type ErasedSchema = Arc<dyn Any + Send + Sync>;

/// Per-process schema memo, keyed by record type.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<TypeId, ErasedSchema>>,
    sealed: AtomicBool,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the schema of `R`, describing it on first use.
    ///
    /// Every call for the same type returns the same `Arc`.
    pub fn schema<R: Record>(&self) -> Result<Arc<Schema<R>>, SchemaError> {
        if let Some(schema) = self.cached::<R>() {
            return Ok(schema);
        }
        if self.is_sealed() {
            return Err(SchemaError::UnknownRecord { record: R::NAME });
        }

        let described: ErasedSchema = Arc::new(Schema::<R>::describe()?);
        let entry = {
            let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(schemas.entry(TypeId::of::<R>()).or_insert(described))
        };
        debug!(record = R::NAME, "described record schema");
        typed::<R>(entry).ok_or(SchemaError::UnknownRecord { record: R::NAME })
    }

    /// Describe `R` and every record type nested inside it.
    pub fn register<R: Record>(&self) -> Result<(), SchemaError> {
        let schema = self.schema::<R>()?;
        schema.register_nested(self)
    }

    /// Field tree of `R` with nested records expanded.
    pub fn outline<R: Record>(&self) -> Result<Outline, SchemaError> {
        let schema = self.schema::<R>()?;
        schema.outline(self)
    }

    /// Refuse to describe any type not yet registered.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn is_registered<R: Record>(&self) -> bool {
        self.cached::<R>().is_some()
    }

    /// Number of described record types.
    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached<R: Record>(&self) -> Option<Arc<Schema<R>>> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        schemas.get(&TypeId::of::<R>()).cloned().and_then(typed::<R>)
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("records", &self.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

fn typed<R: Record>(entry: ErasedSchema) -> Option<Arc<Schema<R>>> {
    entry.downcast::<Schema<R>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{OutlineShape, SchemaBuilder};

    #[derive(Debug, Default)]
    struct Inner {
        code: String,
    }

    impl Record for Inner {
        const NAME: &'static str = "Inner";

        fn describe(schema: &mut SchemaBuilder<Self>) {
            schema.field("code", |r| &r.code, |r, v| r.code = v);
        }
    }

    #[derive(Debug, Default)]
    struct Outer {
        id: String,
        inner: Inner,
        flag: bool,
    }

    impl Record for Outer {
        const NAME: &'static str = "Outer";

        fn describe(schema: &mut SchemaBuilder<Self>) {
            schema
                .field("id", |r| &r.id, |r, v| r.id = v)
                .nested("inner", |r| &r.inner, |r| &mut r.inner)
                .field("flag", |r| &r.flag, |r, v| r.flag = v);
        }
    }

    #[test]
    fn schema_is_memoized_per_type() {
        let registry = SchemaRegistry::new();
        let first = registry.schema::<Outer>().expect("describe");
        let second = registry.schema::<Outer>().expect("describe");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn nested_types_are_described_on_demand() {
        let registry = SchemaRegistry::new();
        registry.schema::<Outer>().expect("describe");
        assert!(!registry.is_registered::<Inner>());

        registry.register::<Outer>().expect("register");
        assert!(registry.is_registered::<Inner>());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn sealed_registry_rejects_unknown_types() {
        let registry = SchemaRegistry::new();
        registry.schema::<Inner>().expect("describe");
        registry.seal();

        assert!(registry.schema::<Inner>().is_ok());
        assert_eq!(
            registry.schema::<Outer>().expect_err("sealed"),
            SchemaError::UnknownRecord { record: "Outer" }
        );
    }

    #[test]
    fn outline_expands_nested_records() {
        let registry = SchemaRegistry::new();
        let outline = registry.outline::<Outer>().expect("outline");
        assert_eq!(outline.record, "Outer");
        assert_eq!(outline.scalar_paths(), vec!["id", "inner.code", "flag"]);
        assert!(matches!(
            &outline.fields[1].shape,
            OutlineShape::Nested(inner) if inner.record == "Inner"
        ));
    }
}
