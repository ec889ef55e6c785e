//! Record types and their field descriptors.
//!
//! A record type lists its fields once, in [`Record::describe`], as
//! `(name, getter, setter)` triples. The resulting [`Schema`] is immutable
//! and owns no per-traversal state.

use crate::error::{SchemaError, TraverseError};
use crate::registry::SchemaRegistry;
use crate::traverse::{ReadPass, WritePass};
use crate::value::{FieldType, FieldValue, Value, ValueRef};
use std::collections::HashSet;
use std::fmt;

/// A record type with a declared schema.
///
/// ```ignore
/// #[derive(Default)]
/// struct Person {
///     name: String,
///     age: i64,
/// }
///
/// impl Record for Person {
///     const NAME: &'static str = "Person";
///
///     fn describe(schema: &mut SchemaBuilder<Self>) {
///         schema
///             .field("name", |p| &p.name, |p, v| p.name = v)
///             .field("age", |p| &p.age, |p, v| p.age = v);
///     }
/// }
/// ```
pub trait Record: Default + Send + Sync + 'static {
    /// Record type name, used in diagnostics.
    const NAME: &'static str;

    /// List the record's fields, in traversal order.
    fn describe(schema: &mut SchemaBuilder<Self>);
}

/// Collects field descriptors for one record type.
pub struct SchemaBuilder<R> {
    record: &'static str,
    fields: Vec<FieldDescriptor<R>>,
}

impl<R: Record> SchemaBuilder<R> {
    /// Declare a scalar (or optional scalar) field.
    pub fn field<T: FieldValue>(
        &mut self,
        name: &'static str,
        get: fn(&R) -> &T,
        set: fn(&mut R, T),
    ) -> &mut Self {
        self.fields.push(FieldDescriptor {
            name,
            access: Access::Scalar(Box::new(BoundScalar { get, set })),
        });
        self
    }

    /// Declare a nested record field.
    pub fn nested<N: Record>(
        &mut self,
        name: &'static str,
        get: fn(&R) -> &N,
        get_mut: fn(&mut R) -> &mut N,
    ) -> &mut Self {
        self.fields.push(FieldDescriptor {
            name,
            access: Access::Nested(Box::new(BoundNested { get, get_mut })),
        });
        self
    }

    fn build(self) -> Result<Schema<R>, SchemaError> {
        let mut seen = HashSet::new();
        for (position, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    record: self.record,
                    position,
                });
            }
            if !seen.insert(field.name) {
                return Err(SchemaError::DuplicateField {
                    record: self.record,
                    field: field.name,
                });
            }
        }
        Ok(Schema {
            record: self.record,
            fields: self.fields,
        })
    }
}

/// The ordered field descriptors of one record type.
pub struct Schema<R> {
    record: &'static str,
    fields: Vec<FieldDescriptor<R>>,
}

impl<R: Record> Schema<R> {
    /// Run `R::describe` and validate the result.
    pub fn describe() -> Result<Self, SchemaError> {
        let mut builder = SchemaBuilder {
            record: R::NAME,
            fields: Vec::new(),
        };
        R::describe(&mut builder);
        builder.build()
    }
}

impl<R> Schema<R> {
    pub fn record_name(&self) -> &'static str {
        self.record
    }

    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<R>> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("record", &self.record)
            .field("fields", &self.fields)
            .finish()
    }
}

/// What a field holds, as visible outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(FieldType),
    Nested(&'static str),
}

/// One named field of one record type, bound to its accessors.
pub struct FieldDescriptor<R> {
    name: &'static str,
    access: Access<R>,
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        match &self.access {
            Access::Scalar(access) => FieldKind::Scalar(access.field_type()),
            Access::Nested(access) => FieldKind::Nested(access.record_name()),
        }
    }

    pub(crate) fn access(&self) -> &Access<R> {
        &self.access
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

pub(crate) enum Access<R> {
    Scalar(Box<dyn ScalarAccess<R>>),
    Nested(Box<dyn NestedAccess<R>>),
}

pub(crate) trait ScalarAccess<R>: Send + Sync {
    fn field_type(&self) -> FieldType;

    fn read<'a>(&self, record: &'a R) -> ValueRef<'a>;

    fn write(&self, record: &mut R, value: Value) -> Result<(), Value>;

    fn write_text(&self, record: &mut R, text: &str) -> bool;
}

pub(crate) trait NestedAccess<R>: Send + Sync {
    fn record_name(&self) -> &'static str;

    fn register(&self, registry: &SchemaRegistry) -> Result<(), SchemaError>;

    fn outline(&self, registry: &SchemaRegistry) -> Result<Outline, SchemaError>;

    fn read(&self, record: &R, pass: &mut ReadPass<'_, '_>) -> Result<(), TraverseError>;

    fn write(&self, record: &mut R, pass: &mut WritePass<'_, '_>) -> Result<(), TraverseError>;
}

struct BoundScalar<R, T> {
    get: fn(&R) -> &T,
    set: fn(&mut R, T),
}

impl<R: Record, T: FieldValue> ScalarAccess<R> for BoundScalar<R, T> {
    fn field_type(&self) -> FieldType {
        T::TYPE
    }

    fn read<'a>(&self, record: &'a R) -> ValueRef<'a> {
        (self.get)(record).to_value_ref()
    }

    fn write(&self, record: &mut R, value: Value) -> Result<(), Value> {
        let value = T::from_value(value)?;
        (self.set)(record, value);
        Ok(())
    }

    fn write_text(&self, record: &mut R, text: &str) -> bool {
        match T::parse_text(text) {
            Some(value) => {
                (self.set)(record, value);
                true
            }
            None => false,
        }
    }
}

struct BoundNested<R, N> {
    get: fn(&R) -> &N,
    get_mut: fn(&mut R) -> &mut N,
}

impl<R: Record, N: Record> NestedAccess<R> for BoundNested<R, N> {
    fn record_name(&self) -> &'static str {
        N::NAME
    }

    fn register(&self, registry: &SchemaRegistry) -> Result<(), SchemaError> {
        registry.register::<N>()
    }

    fn outline(&self, registry: &SchemaRegistry) -> Result<Outline, SchemaError> {
        registry.outline::<N>()
    }

    fn read(&self, record: &R, pass: &mut ReadPass<'_, '_>) -> Result<(), TraverseError> {
        pass.record((self.get)(record))
    }

    fn write(&self, record: &mut R, pass: &mut WritePass<'_, '_>) -> Result<(), TraverseError> {
        pass.record((self.get_mut)(record))
    }
}

/// A record type's field tree, with nested records expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub record: &'static str,
    pub fields: Vec<OutlineField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineField {
    pub name: &'static str,
    pub shape: OutlineShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineShape {
    Scalar(FieldType),
    Nested(Outline),
}

impl Outline {
    /// Dotted paths of every scalar field, in traversal order.
    pub fn scalar_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_paths("", &mut out);
        out
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for field in &self.fields {
            let path = if prefix.is_empty() {
                field.name.to_string()
            } else {
                format!("{prefix}.{}", field.name)
            };
            match &field.shape {
                OutlineShape::Scalar(_) => out.push(path),
                OutlineShape::Nested(inner) => inner.collect_paths(&path, out),
            }
        }
    }
}

impl<R: Record> Schema<R> {
    pub(crate) fn outline(&self, registry: &SchemaRegistry) -> Result<Outline, SchemaError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let shape = match &field.access {
                Access::Scalar(access) => OutlineShape::Scalar(access.field_type()),
                Access::Nested(access) => OutlineShape::Nested(access.outline(registry)?),
            };
            fields.push(OutlineField {
                name: field.name,
                shape,
            });
        }
        Ok(Outline {
            record: self.record,
            fields,
        })
    }

    pub(crate) fn register_nested(&self, registry: &SchemaRegistry) -> Result<(), SchemaError> {
        for field in &self.fields {
            if let Access::Nested(access) = &field.access {
                access.register(registry)?;
            }
        }
        Ok(())
    }
}
