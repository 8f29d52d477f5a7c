use serde_json::{Map, Value};

use crate::data::{
    dispatch::{FieldContext, build_node},
    schema::{SchemaError, SchemaFragment, SchemaType},
    types::{ElementBase, Node, WriteMode, humanize},
};

/// Composite node for `type: "object"` schemas.
///
/// Children are kept in schema order and are never replaced after
/// construction; value writes are delegated into them.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    /// Shared element metadata.
    pub base: ElementBase,
    children: Vec<(String, Node)>,
}

impl ObjectNode {
    pub(crate) fn build(fragment: &SchemaFragment, ctx: FieldContext) -> Result<Self, SchemaError> {
        let properties = match &fragment.properties {
            Some(properties) if !properties.is_empty() => properties,
            _ => {
                return Err(SchemaError::SchemaMissingFields {
                    path: ctx.path,
                    fields: vec!["properties".to_string()],
                });
            }
        };

        let mut children = Vec::with_capacity(properties.len());
        for (name, schema) in properties {
            let child_ctx = ctx.property(name, fragment.is_required(name));
            children.push((name.clone(), build_node(schema, child_ctx)?));
        }
        debug!("object `{}` built with {} children", ctx.path, children.len());

        let label = match (&fragment.title, &ctx.name) {
            (Some(title), _) => title.clone(),
            (None, Some(name)) => humanize(name),
            (None, None) => humanize(SchemaType::Object.as_str()),
        };

        Ok(ObjectNode {
            base: ElementBase {
                path: ctx.path,
                name: ctx.name,
                label,
                description: fragment.description.clone(),
                required: ctx.required,
            },
            children,
        })
    }

    /// Mapping of property name to child value, in schema order.
    pub fn value(&self) -> Value {
        let map: Map<String, Value> = self
            .children
            .iter()
            .map(|(name, child)| (name.clone(), child.value()))
            .collect();
        Value::Object(map)
    }

    /// Write a mapping into the children named by its keys.
    ///
    /// Keys missing from the mapping keep their current value.
    pub fn set_value(&mut self, value: &Value) -> Result<(), SchemaError> {
        self.check_value(value, WriteMode::Edit)?;
        self.apply_value(value, WriteMode::Edit)
    }

    pub(crate) fn check_value(&self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        let map = value
            .as_object()
            .ok_or_else(|| SchemaError::type_mismatch(&self.base.path, "object", value))?;
        for (key, v) in map {
            self.known_child(key)?.check_value(v, mode)?;
        }
        Ok(())
    }

    pub(crate) fn apply_value(&mut self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        let map = value
            .as_object()
            .ok_or_else(|| SchemaError::type_mismatch(&self.base.path, "object", value))?;
        for (key, v) in map {
            let path = self.base.path.clone();
            let child = self
                .child_mut(key)
                .ok_or_else(|| SchemaError::UnknownProperty {
                    path,
                    key: key.clone(),
                })?;
            child.apply_value(v, mode)?;
        }
        Ok(())
    }

    /// True when *any* child is empty, i.e. the object is incomplete.
    ///
    /// Lists rely on this to refuse adding a new item while a previous one
    /// is still only partly filled in.
    pub fn is_empty(&self) -> bool {
        self.children.iter().any(|(_, child)| child.is_empty())
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, child)| child)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, child)| child)
    }

    /// Children in schema order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children
            .iter()
            .map(|(name, child)| (name.as_str(), child))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    fn known_child(&self, key: &str) -> Result<&Node, SchemaError> {
        self.child(key).ok_or_else(|| SchemaError::UnknownProperty {
            path: self.base.path.clone(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dispatch::build;
    use serde_json::json;

    fn person() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "number"}
            },
            "required": ["name"]
        })
    }

    #[test]
    fn test_person_scenario() {
        let mut node = build(&person()).unwrap();
        let object = node.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.child("name").unwrap().base().required);
        assert!(!object.child("age").unwrap().base().required);
        assert_eq!(node.value(), json!({"name": "", "age": 0}));

        node.set_value(&json!({"name": "Ann", "age": 30})).unwrap();
        assert_eq!(node.value(), json!({"name": "Ann", "age": 30}));
    }

    #[test]
    fn test_keys_match_properties() {
        let node = build(&json!({
            "type": "object",
            "properties": {
                "z": {"type": "string"},
                "a": {"type": "number"},
                "m": {"type": "object", "properties": {"k": {"type": "string"}}}
            }
        }))
        .unwrap();
        let value = node.value();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(value["m"], json!({"k": ""}));
    }

    #[test]
    fn test_partial_write_keeps_other_children() {
        let mut node = build(&person()).unwrap();
        node.set_value(&json!({"name": "Ann", "age": 30})).unwrap();
        node.set_value(&json!({"age": 31})).unwrap();
        assert_eq!(node.value(), json!({"name": "Ann", "age": 31}));
    }

    #[test]
    fn test_unknown_property_is_rejected_atomically() {
        let mut node = build(&person()).unwrap();
        let err = node
            .set_value(&json!({"name": "Bob", "height": 2}))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownProperty {
                path: "$".to_string(),
                key: "height".to_string()
            }
        );
        assert_eq!(node.value(), json!({"name": "", "age": 0}));
    }

    #[test]
    fn test_write_keeps_structure() {
        let mut node = build(&person()).unwrap();
        node.set_value(&json!({"name": "Ann"})).unwrap();
        let object = node.as_object().unwrap();
        assert!(object.child("name").unwrap().as_leaf().is_some());
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["name", "age"]);
    }

    #[test]
    fn test_non_object_value() {
        let mut node = build(&person()).unwrap();
        assert!(matches!(
            node.set_value(&json!(["Ann"])),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_is_empty_means_incomplete() {
        let mut node = build(&person()).unwrap();
        assert!(node.is_empty());
        node.set_value(&json!({"name": "Ann"})).unwrap();
        assert!(node.is_empty());
        node.set_value(&json!({"age": 4})).unwrap();
        assert!(!node.is_empty());
    }

    #[test]
    fn test_missing_properties() {
        for schema in [
            json!({"type": "object"}),
            json!({"type": "object", "properties": {}}),
        ] {
            assert!(matches!(
                build(&schema),
                Err(SchemaError::SchemaMissingFields { fields, .. }) if fields == vec!["properties"]
            ));
        }
    }

    #[test]
    fn test_child_error_aborts_build() {
        let err = build(&json!({
            "type": "object",
            "properties": {"bad": {"type": "null"}}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedSchema { path, .. } if path == "$.bad"
        ));
    }
}
