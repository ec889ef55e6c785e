//! Outbound JSON serialization.
//!
//! Streams one compact JSON object per traversal into any `io::Write`.
//! Absent optionals are written as `null`; timestamps as RFC 3339 strings
//! in UTC.

use crate::JSON;
use bindery_core::{
    Capability, ReadVisitor, Record, SchemaRegistry, Traversal, TraverseError, ValueRef,
};
use chrono::SecondsFormat;
use std::io::{self, Write};

/// Writes a record as JSON text.
#[derive(Debug)]
pub struct JsonVisitor<W> {
    out: W,
    // One entry per open object: whether no member has been written yet.
    first: Vec<bool>,
}

impl<W: Write> JsonVisitor<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            first: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn key(&mut self, name: &str) -> io::Result<()> {
        if let Some(first) = self.first.last_mut() {
            if !*first {
                self.out.write_all(b",")?;
            }
            *first = false;
        }
        serde_json::to_writer(&mut self.out, name)?;
        self.out.write_all(b":")
    }

    fn value(&mut self, value: ValueRef<'_>) -> io::Result<()> {
        match value {
            ValueRef::Str(s) => serde_json::to_writer(&mut self.out, s).map_err(io::Error::from),
            ValueRef::Int(i) => write!(self.out, "{i}"),
            ValueRef::Bool(b) => write!(self.out, "{b}"),
            ValueRef::Float(x) if x.is_finite() => {
                serde_json::to_writer(&mut self.out, &x).map_err(io::Error::from)
            }
            ValueRef::Float(_) | ValueRef::Null => self.out.write_all(b"null"),
            ValueRef::Timestamp(t) => {
                let text = t.to_rfc3339_opts(SecondsFormat::AutoSi, true);
                serde_json::to_writer(&mut self.out, &text).map_err(io::Error::from)
            }
        }
    }
}

impl<W: Write> ReadVisitor for JsonVisitor<W> {
    fn capability(&self) -> Capability {
        Capability::Json
    }

    fn begin_record(&mut self) -> Result<(), TraverseError> {
        self.out.write_all(b"{")?;
        self.first.push(true);
        Ok(())
    }

    fn visit_scalar(&mut self, name: &str, value: ValueRef<'_>) -> Result<(), TraverseError> {
        self.key(name)?;
        self.value(value)?;
        Ok(())
    }

    fn visit_nested(&mut self, name: &str) -> Result<(), TraverseError> {
        self.key(name)?;
        Ok(())
    }

    fn end_record(&mut self) -> Result<(), TraverseError> {
        self.first.pop();
        self.out.write_all(b"}")?;
        Ok(())
    }
}

/// Serialize `record` as JSON into `out`.
pub fn write_json<R: Record, W: Write>(
    registry: &SchemaRegistry,
    record: &R,
    out: W,
) -> Result<W, TraverseError> {
    let mut visitor = JsonVisitor::new(out);
    Traversal::new(registry, "result", JSON).read(record, &mut [&mut visitor])?;
    Ok(visitor.into_inner())
}

/// Serialize `record` as a JSON string.
pub fn to_json_string<R: Record>(
    registry: &SchemaRegistry,
    record: &R,
) -> Result<String, TraverseError> {
    let bytes = write_json(registry, record, Vec::new())?;
    String::from_utf8(bytes)
        .map_err(|e| TraverseError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(values: &[(&str, ValueRef<'_>)]) -> String {
        let mut visitor = JsonVisitor::new(Vec::new());
        visitor.begin_record().expect("begin");
        for (name, value) in values {
            visitor.visit_scalar(name, *value).expect("scalar");
        }
        visitor.end_record().expect("end");
        String::from_utf8(visitor.into_inner()).expect("utf8")
    }

    #[test]
    fn strings_are_escaped() {
        let text = render(&[("quote", ValueRef::Str("say \"hi\"\n"))]);
        assert_eq!(text, r#"{"quote":"say \"hi\"\n"}"#);
    }

    #[test]
    fn non_finite_floats_become_null() {
        let text = render(&[
            ("nan", ValueRef::Float(f64::NAN)),
            ("half", ValueRef::Float(0.5)),
        ]);
        assert_eq!(text, r#"{"nan":null,"half":0.5}"#);
    }

    #[test]
    fn empty_record_is_an_empty_object() {
        assert_eq!(render(&[]), "{}");
    }
}
