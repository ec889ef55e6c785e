//! BSON document visitors: the storage representation.
//!
//! [`DocumentWriter`] appends one entry per field, in traversal order, so a
//! given record always encodes to the same bytes. [`DocumentReader`] reads a
//! stored document back and is strict: a stored value whose BSON tag cannot
//! hold the declared field type is a [`TraverseError::TypeMismatch`].
//!
//! BSON datetimes hold whole milliseconds. The writer rejects a timestamp
//! with finer precision as [`TraverseError::Unrepresentable`] instead of
//! storing a different instant.

use crate::DB;
use bindery_core::{
    Capability, FieldType, ReadVisitor, Record, ScalarKind, ScalarSlot, SchemaRegistry,
    Traversal, TraverseError, Value, ValueRef, WriteVisitor, is_millisecond_precise,
};
use bson::{Bson, Document, RawBsonRef, RawDocument, RawDocumentBuf};

/// Builds a `bson::Document` from a record.
#[derive(Debug, Default)]
pub struct DocumentWriter {
    stack: Vec<(Option<String>, Document)>,
    pending: Option<String>,
    finished: Option<Document>,
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root document, once the traversal has closed it.
    pub fn finish(self) -> Option<Document> {
        self.finished
    }

    fn path_of(&self, name: &str) -> String {
        let mut parts: Vec<&str> = self
            .stack
            .iter()
            .filter_map(|(parent, _)| parent.as_deref())
            .collect();
        parts.push(name);
        parts.join(".")
    }
}

impl ReadVisitor for DocumentWriter {
    fn capability(&self) -> Capability {
        Capability::DocumentWrite
    }

    fn begin_record(&mut self) -> Result<(), TraverseError> {
        self.stack.push((self.pending.take(), Document::new()));
        Ok(())
    }

    fn visit_scalar(&mut self, name: &str, value: ValueRef<'_>) -> Result<(), TraverseError> {
        if let ValueRef::Timestamp(at) = value {
            if !is_millisecond_precise(at) {
                return Err(TraverseError::Unrepresentable {
                    path: self.path_of(name),
                    message: format!("{at:?} has sub-millisecond precision"),
                });
            }
        }
        if let Some((_, doc)) = self.stack.last_mut() {
            doc.insert(name, value_to_bson(value));
        }
        Ok(())
    }

    fn visit_nested(&mut self, name: &str) -> Result<(), TraverseError> {
        self.pending = Some(name.to_string());
        Ok(())
    }

    fn end_record(&mut self) -> Result<(), TraverseError> {
        let Some((name, doc)) = self.stack.pop() else {
            return Ok(());
        };
        match (self.stack.last_mut(), name) {
            (Some((_, parent)), Some(name)) => {
                parent.insert(name, Bson::Document(doc));
            }
            _ => self.finished = Some(doc),
        }
        Ok(())
    }
}

/// Reads a stored document into a record.
#[derive(Debug)]
pub struct DocumentReader<'a> {
    root: &'a RawDocument,
    stack: Vec<Option<&'a RawDocument>>,
    pending: Option<Option<&'a RawDocument>>,
    path: Vec<String>,
}

impl<'a> DocumentReader<'a> {
    pub fn new(root: &'a RawDocument) -> Self {
        Self {
            root,
            stack: Vec::new(),
            pending: None,
            path: Vec::new(),
        }
    }

    fn current(&self) -> Option<&'a RawDocument> {
        self.stack.last().copied().flatten()
    }

    fn path_of(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path.join("."))
        }
    }

    fn lookup(
        &self,
        doc: &'a RawDocument,
        name: &str,
    ) -> Result<Option<RawBsonRef<'a>>, TraverseError> {
        doc.get(name).map_err(|e| TraverseError::Corrupt {
            path: self.path_of(name),
            message: e.to_string(),
        })
    }
}

impl WriteVisitor for DocumentReader<'_> {
    fn capability(&self) -> Capability {
        Capability::DocumentView
    }

    fn begin_record(&mut self) -> Result<(), TraverseError> {
        let node = match self.pending.take() {
            Some(node) => node,
            None => Some(self.root),
        };
        self.stack.push(node);
        Ok(())
    }

    fn visit_scalar(
        &mut self,
        name: &str,
        slot: &mut dyn ScalarSlot,
    ) -> Result<(), TraverseError> {
        let Some(doc) = self.current() else {
            return Ok(());
        };
        let Some(raw) = self.lookup(doc, name)? else {
            return Ok(());
        };

        let expected = slot.field_type();
        let value = typed_value(raw, expected).ok_or_else(|| TraverseError::TypeMismatch {
            path: self.path_of(name),
            expected: expected.to_string(),
            found: tag_name(raw),
        })?;
        slot.assign(value).map_err(|rejected| TraverseError::TypeMismatch {
            path: self.path_of(name),
            expected: expected.to_string(),
            found: rejected.tag().to_string(),
        })
    }

    fn visit_nested(&mut self, name: &str) -> Result<(), TraverseError> {
        let child = match self.current() {
            None => None,
            Some(doc) => match self.lookup(doc, name)? {
                None => None,
                Some(RawBsonRef::Document(inner)) => Some(inner),
                Some(other) => {
                    return Err(TraverseError::TypeMismatch {
                        path: self.path_of(name),
                        expected: "document".to_string(),
                        found: tag_name(other),
                    });
                }
            },
        };
        self.pending = Some(child);
        self.path.push(name.to_string());
        Ok(())
    }

    fn end_record(&mut self) -> Result<(), TraverseError> {
        self.stack.pop();
        if !self.stack.is_empty() {
            self.path.pop();
        }
        Ok(())
    }
}

/// Map one engine value onto its BSON representation.
pub fn value_to_bson(value: ValueRef<'_>) -> Bson {
    match value {
        ValueRef::Str(s) => Bson::String(s.to_string()),
        ValueRef::Int(i) => Bson::Int64(i),
        ValueRef::Bool(b) => Bson::Boolean(b),
        ValueRef::Float(x) => Bson::Double(x),
        ValueRef::Timestamp(t) => Bson::DateTime(bson::DateTime::from_chrono(t)),
        ValueRef::Null => Bson::Null,
    }
}

/// Untyped conversion of a stored value, for the tags the engine knows.
pub fn value_from_raw(raw: RawBsonRef<'_>) -> Option<Value> {
    match raw {
        RawBsonRef::String(s) => Some(Value::Str(s.to_string())),
        RawBsonRef::Int32(i) => Some(Value::Int(i64::from(i))),
        RawBsonRef::Int64(i) => Some(Value::Int(i)),
        RawBsonRef::Boolean(b) => Some(Value::Bool(b)),
        RawBsonRef::Double(x) => Some(Value::Float(x)),
        RawBsonRef::DateTime(dt) => Some(Value::Timestamp(dt.to_chrono())),
        RawBsonRef::Null => Some(Value::Null),
        _ => None,
    }
}

/// Debug name of a stored value's BSON tag.
pub fn tag_name(raw: RawBsonRef<'_>) -> String {
    format!("{:?}", raw.element_type())
}

fn typed_value(raw: RawBsonRef<'_>, expected: FieldType) -> Option<Value> {
    match (expected.kind, raw) {
        (_, RawBsonRef::Null) if expected.nullable => Some(Value::Null),
        (ScalarKind::Str, RawBsonRef::String(_))
        | (ScalarKind::Int, RawBsonRef::Int32(_) | RawBsonRef::Int64(_))
        | (ScalarKind::Bool, RawBsonRef::Boolean(_))
        | (ScalarKind::Float, RawBsonRef::Double(_))
        | (ScalarKind::Timestamp, RawBsonRef::DateTime(_)) => value_from_raw(raw),
        (ScalarKind::Float, RawBsonRef::Int32(i)) => Some(Value::Float(f64::from(i))),
        (ScalarKind::Float, RawBsonRef::Int64(i)) => Some(Value::Float(i as f64)),
        _ => None,
    }
}

/// Encode `record` as a BSON document.
pub fn encode_document<R: Record>(
    registry: &SchemaRegistry,
    record: &R,
) -> Result<Document, TraverseError> {
    let mut writer = DocumentWriter::new();
    Traversal::new(registry, "data", DB).read(record, &mut [&mut writer])?;
    Ok(writer.finish().unwrap_or_default())
}

/// Encode `record` as raw BSON bytes.
pub fn encode_raw<R: Record>(
    registry: &SchemaRegistry,
    record: &R,
) -> Result<RawDocumentBuf, TraverseError> {
    let doc = encode_document(registry, record)?;
    RawDocumentBuf::from_document(&doc).map_err(|e| TraverseError::Corrupt {
        path: R::NAME.to_string(),
        message: e.to_string(),
    })
}

/// Decode a stored document into a fresh `R`.
///
/// The record is staged and only returned when every field converted, so a
/// failed view never leaves a partially-populated value behind.
pub fn decode_document<R: Record>(
    registry: &SchemaRegistry,
    doc: &RawDocument,
) -> Result<R, TraverseError> {
    let mut staged = R::default();
    let mut reader = DocumentReader::new(doc);
    Traversal::new(registry, "data", DB).write(&mut staged, &mut [&mut reader])?;
    Ok(staged)
}

/// Decode a stored document over `target`, replacing it only on success.
pub fn decode_into<R: Record>(
    registry: &SchemaRegistry,
    doc: &RawDocument,
    target: &mut R,
) -> Result<(), TraverseError> {
    *target = decode_document(registry, doc)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use chrono::{TimeZone, Utc};

    #[test]
    fn typed_value_widens_ints_for_floats_only() {
        let float = FieldType::required(ScalarKind::Float);
        let int = FieldType::required(ScalarKind::Int);
        assert_eq!(
            typed_value(RawBsonRef::Int32(3), float),
            Some(Value::Float(3.0))
        );
        assert_eq!(typed_value(RawBsonRef::Double(3.0), int), None);
        assert_eq!(typed_value(RawBsonRef::Int32(3), int), Some(Value::Int(3)));
    }

    #[test]
    fn null_is_only_accepted_for_nullable_fields() {
        let text = FieldType::required(ScalarKind::Str);
        assert_eq!(typed_value(RawBsonRef::Null, text), None);
        assert_eq!(
            typed_value(RawBsonRef::Null, text.nullable()),
            Some(Value::Null)
        );
    }

    #[test]
    fn timestamps_map_to_bson_datetimes() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let bson = value_to_bson(ValueRef::Timestamp(at));
        assert_eq!(bson, Bson::DateTime(bson::DateTime::from_chrono(at)));

        let raw = RawDocumentBuf::from_document(&doc! { "at": bson }).expect("raw");
        let stored = raw.get("at").expect("valid").expect("present");
        assert_eq!(value_from_raw(stored), Some(Value::Timestamp(at)));
    }

    #[test]
    fn writer_names_the_nested_path_of_an_unstorable_timestamp() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let mut writer = DocumentWriter::new();
        writer.begin_record().expect("root");
        writer.visit_nested("details").expect("nested");
        writer.begin_record().expect("child");

        let err = writer
            .visit_scalar("published", ValueRef::Timestamp(at))
            .expect_err("sub-millisecond timestamp");
        assert!(
            matches!(err, TraverseError::Unrepresentable { ref path, .. } if path == "details.published"),
            "{err:?}"
        );
    }
}
