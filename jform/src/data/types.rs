use serde_json::Value;

use crate::data::{
    leaf::LeafNode,
    list::ListNode,
    object::ObjectNode,
    schema::SchemaError,
};

/// Metadata shared by every node of the form tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBase {
    /// Dotted path from the root (`$.people[].name`).
    pub path: String,
    /// Property name, `None` for the root and list items.
    pub name: Option<String>,
    /// Display label derived from `title`, the name or the type.
    pub label: String,
    /// Schema `description`, if any.
    pub description: Option<String>,
    /// Whether the owning object lists this field in `required`.
    pub required: bool,
}

/// Turn a property name into a display label: `first_name` -> `First Name`.
pub fn humanize(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether writes should honour `readOnly`.
///
/// `Restore` is used when loading persisted values into a fresh tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    Edit,
    Restore,
}

/// A node of the compiled form tree.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(LeafNode),
    Object(ObjectNode),
    List(ListNode),
}

impl Node {
    pub fn base(&self) -> &ElementBase {
        match self {
            Node::Leaf(leaf) => &leaf.base,
            Node::Object(object) => &object.base,
            Node::List(list) => &list.base,
        }
    }

    /// Current value of the subtree.
    pub fn value(&self) -> Value {
        match self {
            Node::Leaf(leaf) => leaf.value(),
            Node::Object(object) => object.value(),
            Node::List(list) => list.value(),
        }
    }

    /// Write a value into the subtree.
    ///
    /// The whole value is checked before anything is mutated, so on error
    /// the tree is left untouched.
    pub fn set_value(&mut self, value: &Value) -> Result<(), SchemaError> {
        self.write(value, WriteMode::Edit)
    }

    /// Like [`Node::set_value`] but also fills read-only leaves. Used to load
    /// persisted values, never for user edits.
    pub fn restore_value(&mut self, value: &Value) -> Result<(), SchemaError> {
        self.write(value, WriteMode::Restore)
    }

    fn write(&mut self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        self.check_value(value, mode)?;
        self.apply_value(value, mode)
    }

    pub(crate) fn check_value(&self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        match self {
            Node::Leaf(leaf) => leaf.check_value(value, mode),
            Node::Object(object) => object.check_value(value, mode),
            Node::List(list) => list.check_value(value, mode),
        }
    }

    pub(crate) fn apply_value(&mut self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        match self {
            Node::Leaf(leaf) => leaf.apply_value(value, mode),
            Node::Object(object) => object.apply_value(value, mode),
            Node::List(list) => list.apply_value(value, mode),
        }
    }

    /// See [`ObjectNode::is_empty`] for the composite semantics.
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Leaf(leaf) => leaf.is_empty(),
            Node::Object(object) => object.is_empty(),
            Node::List(list) => list.is_empty(),
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match self {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Node::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListNode> {
        match self {
            Node::List(list) => Some(list),
            _ => None,
        }
    }

    /// Find a descendant by dot-separated key. Object children are addressed
    /// by property name, list items by (possibly negative) index. The empty
    /// key is the node itself.
    pub fn get_by_key(&self, key: &str) -> Option<&Node> {
        let mut node = self;
        for seg in key.split('.').filter(|s| !s.is_empty()) {
            node = match node {
                Node::Object(object) => object.child(seg)?,
                Node::List(list) => list.item(seg.parse().ok()?).ok()?.inner(),
                Node::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// Mutable variant of [`Node::get_by_key`].
    pub fn get_mut_by_key(&mut self, key: &str) -> Option<&mut Node> {
        let mut node = self;
        for seg in key.split('.').filter(|s| !s.is_empty()) {
            node = match node {
                Node::Object(object) => object.child_mut(seg)?,
                Node::List(list) => list.item_mut(seg.parse().ok()?).ok()?.inner_mut(),
                Node::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// Render the tree as an indented outline, one node per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        let base = self.base();
        let indent = "  ".repeat(depth);
        let marker = if base.required { "*" } else { "" };
        let kind = match self {
            Node::Leaf(leaf) => leaf.kind.name().to_string(),
            Node::Object(_) => "object".to_string(),
            Node::List(list) => format!("list[{}]", list.len()),
        };
        let read_only = match self {
            Node::Leaf(leaf) if leaf.read_only => " (read-only)",
            _ => "",
        };
        out.push_str(&format!("{indent}{}{marker}: {kind}{read_only}\n", base.label));

        match self {
            Node::Leaf(_) => {}
            Node::Object(object) => {
                for (_, child) in object.children() {
                    child.write_outline(depth + 1, out);
                }
            }
            Node::List(list) => {
                for item in list.items() {
                    let mark = if item.is_selected() { "[x]" } else { "[ ]" };
                    out.push_str(&format!("{indent}  {mark}\n"));
                    item.inner().write_outline(depth + 2, out);
                }
            }
        }
    }
}
