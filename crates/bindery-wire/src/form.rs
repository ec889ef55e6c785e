//! Inbound binding from hierarchically-keyed request parameters.
//!
//! Parameter keys are paths. `book.details.isbn`, `book[details][isbn]`
//! and `book[details].isbn` all address the same node. The visitor is
//! permissive: a missing or unparsable parameter leaves its field at the
//! value it already had.

use crate::ARGS;
use bindery_core::{
    Capability, Record, ScalarSlot, SchemaRegistry, Traversal, TraverseError, WriteVisitor,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Request parameters arranged as a tree of path segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormTree {
    root: FormNode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FormNode {
    value: Option<String>,
    children: BTreeMap<String, FormNode>,
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `(key, value)` pairs in any order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut tree = Self::new();
        for (key, value) in pairs {
            tree.insert(key.as_ref(), value);
        }
        tree
    }

    /// Build a tree from an `application/x-www-form-urlencoded` string.
    pub fn from_query(query: &str) -> Self {
        let mut tree = Self::new();
        tree.extend_query(query);
        tree
    }

    /// Add every pair of an urlencoded string.
    pub fn extend_query(&mut self, query: &str) {
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (k, v) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            let key = percent_decode(k);
            if key.is_empty() {
                continue;
            }
            self.insert(&key, percent_decode(v));
        }
    }

    /// Insert one parameter. The first value seen for a path wins.
    ///
    /// Returns `false` when the key has no path segments or the path
    /// already holds a value.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> bool {
        let segments = split_key(key);
        if segments.is_empty() {
            return false;
        }
        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if node.value.is_some() {
            return false;
        }
        node.value = Some(value.into());
        true
    }

    /// Look up a value by key, using the same path syntax as `insert`.
    pub fn get(&self, key: &str) -> Option<&str> {
        let mut node = &self.root;
        for segment in split_key(key) {
            node = node.children.get(segment)?;
        }
        node.value.as_deref()
    }

    /// Number of values held in the tree.
    pub fn len(&self) -> usize {
        fn count(node: &FormNode) -> usize {
            usize::from(node.value.is_some()) + node.children.values().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a parameter key into path segments.
pub fn split_key(key: &str) -> Vec<&str> {
    key.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Decode `%XX` escapes and `+` in one urlencoded component.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    out.push(h * 16 + l);
                    i += 3;
                } else {
                    out.push(b'%');
                    i += 1;
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

/// Writes request parameters into a record's fields.
#[derive(Debug)]
pub struct FormVisitor<'a> {
    tree: &'a FormTree,
    stack: Vec<Option<&'a FormNode>>,
    pending: Option<Option<&'a FormNode>>,
    path: Vec<String>,
    rejected: Vec<String>,
}

impl<'a> FormVisitor<'a> {
    pub fn new(tree: &'a FormTree) -> Self {
        Self {
            tree,
            stack: Vec::new(),
            pending: None,
            path: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Paths whose parameter was present but did not parse.
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    fn current(&self) -> Option<&'a FormNode> {
        self.stack.last().copied().flatten()
    }

    fn path_of(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path.join("."))
        }
    }
}

impl WriteVisitor for FormVisitor<'_> {
    fn capability(&self) -> Capability {
        Capability::FormTree
    }

    fn begin_record(&mut self) -> Result<(), TraverseError> {
        let node = match self.pending.take() {
            Some(node) => node,
            None => Some(&self.tree.root),
        };
        self.stack.push(node);
        Ok(())
    }

    fn visit_scalar(
        &mut self,
        name: &str,
        slot: &mut dyn ScalarSlot,
    ) -> Result<(), TraverseError> {
        let text = self
            .current()
            .and_then(|node| node.children.get(name))
            .and_then(|node| node.value.as_deref());
        if let Some(text) = text
            && !slot.assign_text(text)
        {
            let path = self.path_of(name);
            trace!(path = %path, expected = %slot.field_type(), "form parameter did not parse");
            self.rejected.push(path);
        }
        Ok(())
    }

    fn visit_nested(&mut self, name: &str) -> Result<(), TraverseError> {
        let child = self.current().and_then(|node| node.children.get(name));
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

/// Bind request parameters into a fresh `R`.
///
/// Fields without a usable parameter keep `R::default()` values. The only
/// possible error is a schema error.
pub fn bind_form<R: Record>(
    registry: &SchemaRegistry,
    tree: &FormTree,
) -> Result<R, TraverseError> {
    let mut record = R::default();
    bind_form_into(registry, tree, &mut record)?;
    Ok(record)
}

/// Bind request parameters over an existing record.
pub fn bind_form_into<R: Record>(
    registry: &SchemaRegistry,
    tree: &FormTree,
    record: &mut R,
) -> Result<(), TraverseError> {
    let mut visitor = FormVisitor::new(tree);
    Traversal::new(registry, "args", ARGS).write(record, &mut [&mut visitor])
}
