//! The visitor protocol and capability lists.
//!
//! A visitor implements one wire format. Outbound formats implement
//! [`ReadVisitor`] and are shown each field's current value; inbound formats
//! implement [`WriteVisitor`] and are handed a [`ScalarSlot`] to write into.
//!
//! Both protocols have the same four hooks, fired in this shape for every
//! record (including nested ones):
//!
//! ```text
//! begin_record
//!     visit_scalar(name, ..)          for a scalar field
//!     visit_nested(name)              for a nested field, followed by
//!         begin_record .. end_record  the inner record
//! end_record
//! ```

use crate::error::TraverseError;
use crate::value::{FieldType, Value, ValueRef};
use std::fmt;

/// Wire-format kind a visitor implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    FormTree,
    Json,
    DocumentWrite,
    DocumentView,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::FormTree => "form_tree",
            Capability::Json => "json",
            Capability::DocumentWrite => "document_write",
            Capability::DocumentView => "document_view",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The visitor kinds admitted for one traversal call.
///
/// Lists are `const` so call sites can name the legal set next to the code
/// that drives the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityList {
    name: &'static str,
    kinds: &'static [Capability],
}

impl CapabilityList {
    pub const fn new(name: &'static str, kinds: &'static [Capability]) -> Self {
        Self { name, kinds }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kinds(&self) -> &'static [Capability] {
        self.kinds
    }

    pub fn admits(&self, capability: Capability) -> bool {
        self.kinds.contains(&capability)
    }
}

/// Outbound visitor: reads field values.
pub trait ReadVisitor {
    fn capability(&self) -> Capability;

    fn begin_record(&mut self) -> Result<(), TraverseError>;

    fn visit_scalar(&mut self, name: &str, value: ValueRef<'_>) -> Result<(), TraverseError>;

    fn visit_nested(&mut self, name: &str) -> Result<(), TraverseError>;

    fn end_record(&mut self) -> Result<(), TraverseError>;
}

/// Inbound visitor: writes field values.
pub trait WriteVisitor {
    fn capability(&self) -> Capability;

    fn begin_record(&mut self) -> Result<(), TraverseError>;

    fn visit_scalar(&mut self, name: &str, slot: &mut dyn ScalarSlot)
    -> Result<(), TraverseError>;

    fn visit_nested(&mut self, name: &str) -> Result<(), TraverseError>;

    fn end_record(&mut self) -> Result<(), TraverseError>;
}

/// Write access to one scalar field of one record, for the duration of a
/// single `visit_scalar` call.
pub trait ScalarSlot {
    /// Declared type of the field.
    fn field_type(&self) -> FieldType;

    /// Store `value` if it is compatible with the declared type.
    ///
    /// On incompatibility the field is untouched and the value is returned.
    fn assign(&mut self, value: Value) -> Result<(), Value>;

    /// Parse `text` into the declared type and store it.
    ///
    /// Returns `false` (field untouched) when the text does not parse.
    fn assign_text(&mut self, text: &str) -> bool;
}
