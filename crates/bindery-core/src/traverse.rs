//! The traversal engine.
//!
//! A [`Traversal`] walks one record through its schema and drives every
//! admitted visitor through the same hook sequence, in lockstep, in declared
//! field order. Each field is read (or written) exactly once per admitted
//! visitor; nothing is buffered across fields. The first visitor error
//! aborts the walk.

use crate::error::TraverseError;
use crate::registry::SchemaRegistry;
use crate::schema::{Access, Record, ScalarAccess};
use crate::value::{FieldType, Value};
use crate::visitor::{CapabilityList, ReadVisitor, ScalarSlot, WriteVisitor};
use tracing::debug;

/// One configured traversal call: the registry to read schemas from, a
/// label for diagnostics, and the visitor kinds admitted.
#[derive(Debug, Clone, Copy)]
pub struct Traversal<'r> {
    registry: &'r SchemaRegistry,
    label: &'static str,
    capabilities: CapabilityList,
}

impl<'r> Traversal<'r> {
    pub fn new(
        registry: &'r SchemaRegistry,
        label: &'static str,
        capabilities: CapabilityList,
    ) -> Self {
        Self {
            registry,
            label,
            capabilities,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn capabilities(&self) -> CapabilityList {
        self.capabilities
    }

    /// Read-only traversal: show every field's value to the visitors.
    pub fn read<R: Record>(
        &self,
        record: &R,
        visitors: &mut [&mut dyn ReadVisitor],
    ) -> Result<(), TraverseError> {
        let admitted: Vec<bool> = visitors
            .iter()
            .map(|visitor| self.capabilities.admits(visitor.capability()))
            .collect();
        self.log_start(R::NAME, &admitted);

        let mut pass = ReadPass {
            registry: self.registry,
            visitors,
            admitted,
        };
        pass.record(record)
    }

    /// Mutating traversal: let the visitors write every field.
    pub fn write<R: Record>(
        &self,
        record: &mut R,
        visitors: &mut [&mut dyn WriteVisitor],
    ) -> Result<(), TraverseError> {
        let admitted: Vec<bool> = visitors
            .iter()
            .map(|visitor| self.capabilities.admits(visitor.capability()))
            .collect();
        self.log_start(R::NAME, &admitted);

        let mut pass = WritePass {
            registry: self.registry,
            visitors,
            admitted,
        };
        pass.record(record)
    }

    fn log_start(&self, record: &'static str, admitted: &[bool]) {
        let active = admitted.iter().filter(|on| **on).count();
        debug!(
            label = self.label,
            record,
            capabilities = self.capabilities.name(),
            visitors = admitted.len(),
            active,
            "traversal"
        );
    }
}

pub(crate) struct ReadPass<'a, 'v> {
    registry: &'a SchemaRegistry,
    visitors: &'a mut [&'v mut dyn ReadVisitor],
    admitted: Vec<bool>,
}

impl ReadPass<'_, '_> {
    pub(crate) fn record<R: Record>(&mut self, record: &R) -> Result<(), TraverseError> {
        let schema = self.registry.schema::<R>()?;

        self.each(|visitor| visitor.begin_record())?;
        for field in schema.fields() {
            let name = field.name();
            match field.access() {
                Access::Scalar(access) => {
                    let value = access.read(record);
                    self.each(|visitor| visitor.visit_scalar(name, value))?;
                }
                Access::Nested(access) => {
                    self.each(|visitor| visitor.visit_nested(name))?;
                    access.read(record, self)?;
                }
            }
        }
        self.each(|visitor| visitor.end_record())
    }

    fn each(
        &mut self,
        mut hook: impl FnMut(&mut dyn ReadVisitor) -> Result<(), TraverseError>,
    ) -> Result<(), TraverseError> {
        for (visitor, admitted) in self.visitors.iter_mut().zip(&self.admitted) {
            if *admitted {
                hook(&mut **visitor)?;
            }
        }
        Ok(())
    }
}

pub(crate) struct WritePass<'a, 'v> {
    registry: &'a SchemaRegistry,
    visitors: &'a mut [&'v mut dyn WriteVisitor],
    admitted: Vec<bool>,
}

impl WritePass<'_, '_> {
    pub(crate) fn record<R: Record>(&mut self, record: &mut R) -> Result<(), TraverseError> {
        let schema = self.registry.schema::<R>()?;

        self.each(|visitor| visitor.begin_record())?;
        for field in schema.fields() {
            let name = field.name();
            match field.access() {
                Access::Scalar(access) => {
                    let access = access.as_ref();
                    self.each(|visitor| {
                        let mut slot = FieldSlot {
                            record: &mut *record,
                            access,
                        };
                        visitor.visit_scalar(name, &mut slot)
                    })?;
                }
                Access::Nested(access) => {
                    self.each(|visitor| visitor.visit_nested(name))?;
                    access.write(record, self)?;
                }
            }
        }
        self.each(|visitor| visitor.end_record())
    }

    fn each(
        &mut self,
        mut hook: impl FnMut(&mut dyn WriteVisitor) -> Result<(), TraverseError>,
    ) -> Result<(), TraverseError> {
        for (visitor, admitted) in self.visitors.iter_mut().zip(&self.admitted) {
            if *admitted {
                hook(&mut **visitor)?;
            }
        }
        Ok(())
    }
}

struct FieldSlot<'a, R> {
    record: &'a mut R,
    access: &'a dyn ScalarAccess<R>,
}

impl<R> ScalarSlot for FieldSlot<'_, R> {
    fn field_type(&self) -> FieldType {
        self.access.field_type()
    }

    fn assign(&mut self, value: Value) -> Result<(), Value> {
        self.access.write(self.record, value)
    }

    fn assign_text(&mut self, text: &str) -> bool {
        self.access.write_text(self.record, text)
    }
}
