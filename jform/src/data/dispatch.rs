//! Schema-to-tree compilation.

use serde_json::Value;

use crate::data::{
    leaf::LeafNode,
    list::ListNode,
    object::ObjectNode,
    schema::{ROOT_PATH, SchemaError, SchemaFragment, SchemaType, SchemaValidator},
    types::Node,
};

/// Position of a fragment in the tree being built.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldContext {
    pub path: String,
    pub name: Option<String>,
    pub required: bool,
}

impl FieldContext {
    pub fn root() -> Self {
        Self {
            path: ROOT_PATH.to_string(),
            name: None,
            required: false,
        }
    }

    /// Context for property `name` of the object at this position.
    pub fn property(&self, name: &str, required: bool) -> Self {
        Self {
            path: format!("{}.{name}", self.path),
            name: Some(name.to_string()),
            required,
        }
    }

    /// Context for the items of the list at this position. Items carry the
    /// list's name so leaf items get a meaningful label.
    pub fn item(&self) -> Self {
        Self {
            path: format!("{}[]", self.path),
            name: self.name.clone(),
            required: false,
        }
    }
}

/// Validate `schema` and compile it into a form tree.
///
/// # Errors
///
/// - [`SchemaError::SchemaInvalid`] when the document fails the meta-schema.
/// - [`SchemaError::SchemaMissingFields`] when `type`, `properties` or
///   `items` are absent where needed.
/// - [`SchemaError::UnsupportedSchema`] for unknown types and `oneOf`.
pub fn build(schema: &Value) -> Result<Node, SchemaError> {
    SchemaValidator::check_schema(schema)?;
    let node = build_node(schema, FieldContext::root())?;
    info!("form compiled: {} ({})", node.base().label, ROOT_PATH);
    Ok(node)
}

/// Compile one fragment without re-running the meta-schema check.
pub(crate) fn build_node(schema: &Value, ctx: FieldContext) -> Result<Node, SchemaError> {
    let fragment = SchemaFragment::parse(schema, &ctx.path)?;

    if fragment.enumeration.is_some() {
        let ty = fragment.schema_type(&ctx.path).ok();
        return LeafNode::build(&fragment, ty, ctx).map(Node::Leaf);
    }

    let ty = fragment.schema_type(&ctx.path)?;
    match ty {
        SchemaType::String | SchemaType::Number | SchemaType::Integer | SchemaType::Boolean => {
            LeafNode::build(&fragment, Some(ty), ctx).map(Node::Leaf)
        }
        SchemaType::Object => ObjectNode::build(&fragment, ctx).map(Node::Object),
        SchemaType::Array => build_array(&fragment, ctx),
    }
}

fn build_array(fragment: &SchemaFragment, ctx: FieldContext) -> Result<Node, SchemaError> {
    let Some(items) = &fragment.items else {
        return Err(SchemaError::SchemaMissingFields {
            path: ctx.path,
            fields: vec!["items".to_string()],
        });
    };
    if !items.is_object() {
        return Err(SchemaError::UnsupportedSchema {
            path: ctx.path,
            reason: "`items` must be a single schema object".to_string(),
        });
    }

    let item_fragment = SchemaFragment::parse(items, &ctx.item().path)?;
    match item_fragment.enumeration {
        Some(options) => LeafNode::build_multi(fragment, options, ctx).map(Node::Leaf),
        None => ListNode::build(fragment, items, ctx).map(Node::List),
    }
}
