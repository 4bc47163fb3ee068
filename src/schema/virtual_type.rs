use crate::value::{Document, Value};

use indexmap::IndexMap;
use std::{fmt, sync};

/// Computes a virtual value from a document.
pub type VirtualGetter = sync::Arc<dyn Fn(&Document) -> Value + Send + Sync>;

/// Writes a virtual value back into the stored fields of a document.
pub type VirtualSetter = sync::Arc<dyn Fn(&mut Document, Value) + Send + Sync>;

/// Computed, non-stored property of a document, addressed by a dotted path.
///
/// ```rust
/// use dynamodb_odm::schema::virtual_type::VirtualType;
/// use dynamodb_odm::value::Value;
///
/// let mut full_name = VirtualType::new("name.full");
/// full_name.get(|document| {
///     let first = document.get("first").and_then(Value::as_str).unwrap_or_default();
///     let last = document.get("last").and_then(Value::as_str).unwrap_or_default();
///     Value::from(format!("{first} {last}"))
/// });
/// ```
#[derive(Clone)]
pub struct VirtualType {
    path: String,
    getter: Option<VirtualGetter>,
    setter: Option<VirtualSetter>,
}

impl VirtualType {
    /// Virtual with no accessors yet.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            getter: None,
            setter: None,
        }
    }

    /// Dotted path this virtual is registered under.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers the getter.
    pub fn get(
        &mut self,
        getter: impl Fn(&Document) -> Value + Send + Sync + 'static,
    ) -> &mut Self {
        self.getter = Some(sync::Arc::new(getter));
        self
    }

    /// Registers the setter.
    pub fn set(
        &mut self,
        setter: impl Fn(&mut Document, Value) + Send + Sync + 'static,
    ) -> &mut Self {
        self.setter = Some(sync::Arc::new(setter));
        self
    }

    /// Computes the value, if a getter is registered.
    pub fn apply_get(&self, document: &Document) -> Option<Value> {
        self.getter.as_ref().map(|getter| getter(document))
    }

    /// Writes the value through the setter. Returns `false` when no setter is registered.
    pub fn apply_set(&self, document: &mut Document, value: Value) -> bool {
        match &self.setter {
            Some(setter) => {
                setter(document, value);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for VirtualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualType")
            .field("path", &self.path)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

/// Side tree of virtual paths, one branch per path segment.
#[derive(Clone, Debug, Default)]
pub(crate) struct VirtualTree {
    children: IndexMap<String, VirtualNode>,
}

#[derive(Clone, Debug)]
enum VirtualNode {
    Leaf(String),
    Branch(VirtualTree),
}

impl VirtualTree {
    /// Records `path`, creating intermediate branches. A leaf shadowed by a
    /// longer path becomes a branch.
    pub(crate) fn insert(&mut self, path: &str) {
        let mut segments = path.split('.').peekable();
        let mut tree = self;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                tree.children
                    .entry(segment.to_string())
                    .or_insert_with(|| VirtualNode::Leaf(path.to_string()));
                return;
            }
            let node = tree
                .children
                .entry(segment.to_string())
                .or_insert_with(|| VirtualNode::Branch(Self::default()));
            if matches!(node, VirtualNode::Leaf(_)) {
                *node = VirtualNode::Branch(Self::default());
            }
            let VirtualNode::Branch(branch) = node else {
                return;
            };
            tree = branch;
        }
    }

    /// Evaluates every registered getter into nested objects mirroring the tree.
    pub(crate) fn evaluate(
        &self,
        virtuals: &IndexMap<String, VirtualType>,
        document: &Document,
    ) -> Document {
        let mut computed = Document::with_capacity(self.children.len());
        for (segment, node) in &self.children {
            match node {
                VirtualNode::Leaf(path) => {
                    if let Some(value) = virtuals
                        .get(path)
                        .and_then(|virtual_type| virtual_type.apply_get(document))
                    {
                        computed.insert(segment.clone(), value);
                    }
                }
                VirtualNode::Branch(branch) => {
                    let nested = branch.evaluate(virtuals, document);
                    if !nested.is_empty() {
                        computed.insert(segment.clone(), Value::Object(nested));
                    }
                }
            }
        }
        computed
    }
}
