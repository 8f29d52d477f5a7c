use chrono::NaiveDate;
use serde_json::{Number, Value};

use crate::data::{
    dispatch::FieldContext,
    schema::{SchemaError, SchemaFragment, SchemaType},
    types::{ElementBase, WriteMode, humanize},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Construction input for a leaf field.
///
/// Presentation (`label`) and data attributes (`required`, `read_only`) are
/// kept apart; renderers decide how a required field looks.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    pub label: String,
    pub required: bool,
    pub read_only: bool,
    /// Closed option set for choice fields.
    pub options: Option<Vec<Value>>,
}

impl FieldConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            required: false,
            read_only: false,
            options: None,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_options(mut self, options: Vec<Value>) -> Self {
        self.options = Some(options);
        self
    }
}

/// Leaf form field holding a single value.
#[derive(Debug, Clone)]
pub struct LeafNode {
    /// Shared element metadata.
    pub base: ElementBase,
    /// Writes through [`crate::data::types::Node::set_value`] are rejected.
    pub read_only: bool,
    /// Value storage and representation.
    pub kind: LeafKind,
}

/// Supported field representations.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafKind {
    /// Free text.
    Text { value: Option<String> },
    /// Calendar date entered as `YYYY-MM-DD`.
    Date { value: Option<NaiveDate> },
    /// Floating-point number. The JSON number is kept as written.
    Number { value: Option<Number> },
    /// Integral number.
    Integer { value: Option<i64> },
    /// Checkbox.
    Boolean { value: bool },
    /// One selection from a closed set.
    Choice(ChoiceItem),
    /// Any number of selections from a closed set.
    MultiChoice(MultiChoiceItem),
}

/// Enumerated options and the selected index.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceItem {
    pub options: Vec<Value>,
    pub selected: Option<usize>,
}

/// Enumerated options and the selected indices, in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiChoiceItem {
    pub options: Vec<Value>,
    pub selected: Vec<usize>,
}

impl ChoiceItem {
    pub fn new(options: Vec<Value>) -> Self {
        Self {
            options,
            selected: None,
        }
    }

    /// Currently selected option, if any.
    pub fn selected_value(&self) -> Option<&Value> {
        self.selected.and_then(|idx| self.options.get(idx))
    }

    /// Select the option equal to `value`.
    pub fn update_from_value(&mut self, value: &Value, path: &str) -> Result<(), SchemaError> {
        if value.is_null() {
            self.selected = None;
            return Ok(());
        }
        match self.options.iter().position(|o| o == value) {
            Some(idx) => {
                self.selected = Some(idx);
                Ok(())
            }
            None => Err(SchemaError::invalid_value(path, value, &self.options)),
        }
    }
}

impl MultiChoiceItem {
    pub fn new(options: Vec<Value>) -> Self {
        Self {
            options,
            selected: Vec::new(),
        }
    }

    pub fn selected_values(&self) -> Vec<Value> {
        self.selected
            .iter()
            .filter_map(|&idx| self.options.get(idx).cloned())
            .collect()
    }

    pub fn update_from_value(&mut self, value: &Value, path: &str) -> Result<(), SchemaError> {
        let values = match value {
            Value::Null => {
                self.selected.clear();
                return Ok(());
            }
            Value::Array(values) => values,
            _ => return Err(SchemaError::type_mismatch(path, "array", value)),
        };
        let mut selected = Vec::with_capacity(values.len());
        for v in values {
            match self.options.iter().position(|o| o == v) {
                Some(idx) => selected.push(idx),
                None => return Err(SchemaError::invalid_value(path, v, &self.options)),
            }
        }
        self.selected = selected;
        Ok(())
    }
}

impl LeafKind {
    /// Short representation name used in outlines.
    pub fn name(&self) -> &'static str {
        match self {
            LeafKind::Text { .. } => "text",
            LeafKind::Date { .. } => "date",
            LeafKind::Number { .. } => "number",
            LeafKind::Integer { .. } => "integer",
            LeafKind::Boolean { .. } => "boolean",
            LeafKind::Choice(_) => "choice",
            LeafKind::MultiChoice(_) => "multi-choice",
        }
    }

    /// Update the stored value from JSON. `null` clears the field.
    pub fn update_from_value(&mut self, value: &Value, path: &str) -> Result<(), SchemaError> {
        match self {
            LeafKind::Text {
                value: current_value,
            } => match value {
                Value::String(s) => {
                    *current_value = Some(s.clone());
                    Ok(())
                }
                Value::Null => {
                    *current_value = None;
                    Ok(())
                }
                _ => Err(SchemaError::type_mismatch(path, "string", value)),
            },
            LeafKind::Date {
                value: current_value,
            } => match value {
                Value::String(s) if s.is_empty() => {
                    *current_value = None;
                    Ok(())
                }
                Value::String(s) => match NaiveDate::parse_from_str(s, DATE_FORMAT) {
                    Ok(date) => {
                        *current_value = Some(date);
                        Ok(())
                    }
                    Err(_) => Err(SchemaError::type_mismatch(path, "date (YYYY-MM-DD)", value)),
                },
                Value::Null => {
                    *current_value = None;
                    Ok(())
                }
                _ => Err(SchemaError::type_mismatch(path, "date (YYYY-MM-DD)", value)),
            },
            LeafKind::Number {
                value: current_value,
            } => match value {
                Value::Number(n) => {
                    *current_value = Some(n.clone());
                    Ok(())
                }
                Value::Null => {
                    *current_value = None;
                    Ok(())
                }
                _ => Err(SchemaError::type_mismatch(path, "number", value)),
            },
            LeafKind::Integer {
                value: current_value,
            } => match value {
                Value::Number(n) => match integral(n) {
                    Some(i) => {
                        *current_value = Some(i);
                        Ok(())
                    }
                    None => Err(SchemaError::type_mismatch(path, "integer", value)),
                },
                Value::Null => {
                    *current_value = None;
                    Ok(())
                }
                _ => Err(SchemaError::type_mismatch(path, "integer", value)),
            },
            LeafKind::Boolean {
                value: current_value,
            } => match value {
                Value::Bool(b) => {
                    *current_value = *b;
                    Ok(())
                }
                Value::Null => {
                    *current_value = false;
                    Ok(())
                }
                _ => Err(SchemaError::type_mismatch(path, "boolean", value)),
            },
            LeafKind::Choice(choice) => choice.update_from_value(value, path),
            LeafKind::MultiChoice(multi) => multi.update_from_value(value, path),
        }
    }

    /// Serialize the value into JSON. Unset fields read as their empty
    /// representation (`""`, `0`, `false`, `null`, `[]`).
    pub fn as_json(&self) -> Value {
        match self {
            LeafKind::Text { value } => Value::String(value.clone().unwrap_or_default()),
            LeafKind::Date { value } => Value::String(
                value
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_default(),
            ),
            LeafKind::Number { value } => {
                Value::Number(value.clone().unwrap_or_else(|| Number::from(0)))
            }
            LeafKind::Integer { value } => Value::Number(Number::from(value.unwrap_or(0))),
            LeafKind::Boolean { value } => Value::Bool(*value),
            LeafKind::Choice(choice) => choice.selected_value().cloned().unwrap_or(Value::Null),
            LeafKind::MultiChoice(multi) => Value::Array(multi.selected_values()),
        }
    }

    /// "No value entered".
    pub fn is_empty(&self) -> bool {
        match self {
            LeafKind::Text { value } => value.as_deref().is_none_or(str::is_empty),
            LeafKind::Date { value } => value.is_none(),
            LeafKind::Number { value } => value.is_none(),
            LeafKind::Integer { value } => value.is_none(),
            LeafKind::Boolean { .. } => false,
            LeafKind::Choice(choice) => choice.selected.is_none(),
            LeafKind::MultiChoice(multi) => multi.selected.is_empty(),
        }
    }
}

impl LeafNode {
    /// Create a leaf from an explicit field configuration.
    ///
    /// Choice kinds take their options from `config.options`.
    pub fn from_config(path: impl Into<String>, config: FieldConfig, kind: LeafKind) -> Self {
        let kind = match (kind, config.options) {
            (LeafKind::Choice(_), Some(options)) => LeafKind::Choice(ChoiceItem::new(options)),
            (LeafKind::MultiChoice(_), Some(options)) => {
                LeafKind::MultiChoice(MultiChoiceItem::new(options))
            }
            (kind, _) => kind,
        };
        LeafNode {
            base: ElementBase {
                path: path.into(),
                name: None,
                label: config.label,
                description: None,
                required: config.required,
            },
            read_only: config.read_only,
            kind,
        }
    }

    /// Compile a primitive or enumerated schema fragment.
    ///
    /// `enum` takes precedence over `ty`.
    pub(crate) fn build(
        fragment: &SchemaFragment,
        ty: Option<SchemaType>,
        ctx: FieldContext,
    ) -> Result<Self, SchemaError> {
        let mut config = FieldConfig::new(label_for(fragment, ctx.name.as_deref(), ty))
            .with_required(ctx.required)
            .with_read_only(fragment.read_only);

        let kind = if let Some(options) = &fragment.enumeration {
            if options.is_empty() {
                return Err(SchemaError::SchemaInvalid {
                    path: ctx.path,
                    reason: "`enum` must list at least one value".to_string(),
                });
            }
            config = config.with_options(options.clone());
            LeafKind::Choice(ChoiceItem::new(Vec::new()))
        } else {
            match ty {
                Some(SchemaType::String) if fragment.format.as_deref() == Some("date") => {
                    LeafKind::Date { value: None }
                }
                Some(SchemaType::String) => LeafKind::Text { value: None },
                Some(SchemaType::Number) => LeafKind::Number { value: None },
                Some(SchemaType::Integer) => LeafKind::Integer { value: None },
                Some(SchemaType::Boolean) => LeafKind::Boolean { value: false },
                Some(other) => {
                    return Err(SchemaError::UnsupportedSchema {
                        path: ctx.path,
                        reason: format!("`{}` is not a field type", other.as_str()),
                    });
                }
                None => {
                    return Err(SchemaError::SchemaMissingFields {
                        path: ctx.path,
                        fields: vec!["type".to_string()],
                    });
                }
            }
        };

        Self::finish(fragment, config, kind, ctx)
    }

    /// Compile an array whose `items` is an enumeration into a multi-choice
    /// field.
    pub(crate) fn build_multi(
        fragment: &SchemaFragment,
        options: Vec<Value>,
        ctx: FieldContext,
    ) -> Result<Self, SchemaError> {
        if options.is_empty() {
            return Err(SchemaError::SchemaInvalid {
                path: ctx.path,
                reason: "`items.enum` must list at least one value".to_string(),
            });
        }
        let config = FieldConfig::new(label_for(
            fragment,
            ctx.name.as_deref(),
            Some(SchemaType::Array),
        ))
        .with_required(ctx.required)
        .with_read_only(fragment.read_only)
        .with_options(options);
        let kind = LeafKind::MultiChoice(MultiChoiceItem::new(Vec::new()));

        Self::finish(fragment, config, kind, ctx)
    }

    fn finish(
        fragment: &SchemaFragment,
        config: FieldConfig,
        kind: LeafKind,
        ctx: FieldContext,
    ) -> Result<Self, SchemaError> {
        let mut leaf = LeafNode::from_config(ctx.path, config, kind);
        leaf.base.name = ctx.name;
        leaf.base.description = fragment.description.clone();

        if let Some(default) = &fragment.default {
            let path = leaf.base.path.clone();
            leaf.kind
                .update_from_value(default, &path)
                .map_err(|e| SchemaError::SchemaInvalid {
                    path,
                    reason: format!("invalid default: {e}"),
                })?;
        }
        Ok(leaf)
    }

    /// Configuration this leaf was built from.
    pub fn field_config(&self) -> FieldConfig {
        let config = FieldConfig::new(self.base.label.clone())
            .with_required(self.base.required)
            .with_read_only(self.read_only);
        match &self.kind {
            LeafKind::Choice(choice) => config.with_options(choice.options.clone()),
            LeafKind::MultiChoice(multi) => config.with_options(multi.options.clone()),
            _ => config,
        }
    }

    pub fn value(&self) -> Value {
        self.kind.as_json()
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    pub(crate) fn check_value(&self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        if self.read_only && mode == WriteMode::Edit {
            return Err(SchemaError::ReadOnlyViolation {
                path: self.base.path.clone(),
            });
        }
        self.kind.clone().update_from_value(value, &self.base.path)
    }

    pub(crate) fn apply_value(&mut self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        if self.read_only && mode == WriteMode::Edit {
            return Err(SchemaError::ReadOnlyViolation {
                path: self.base.path.clone(),
            });
        }
        self.kind.update_from_value(value, &self.base.path)
    }
}

/// `title`, else the humanized property name, else the type name.
/// Integer view of a JSON number; `7.0` counts as an integer.
fn integral(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        let f = n.as_f64()?;
        (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
    })
}

fn label_for(fragment: &SchemaFragment, name: Option<&str>, ty: Option<SchemaType>) -> String {
    if let Some(title) = &fragment.title {
        return title.clone();
    }
    match (name, ty) {
        (Some(name), _) => humanize(name),
        (None, Some(ty)) => humanize(ty.as_str()),
        (None, None) => "Value".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        dispatch::build,
        types::Node,
    };
    use serde_json::json;

    fn leaf(schema: Value) -> LeafNode {
        match build(&schema).unwrap() {
            Node::Leaf(leaf) => leaf,
            other => panic!("expected a leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_text_field() {
        let mut node = Node::Leaf(leaf(json!({"type": "string"})));
        assert_eq!(node.value(), json!(""));
        assert!(node.is_empty());
        assert_eq!(node.base().label, "String");

        node.set_value(&json!("hello")).unwrap();
        assert_eq!(node.value(), json!("hello"));
        assert!(!node.is_empty());

        node.set_value(&json!("")).unwrap();
        assert!(node.is_empty());

        assert!(matches!(
            node.set_value(&json!(3)),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_number_fields() {
        let mut number = Node::Leaf(leaf(json!({"type": "number"})));
        assert_eq!(number.value(), json!(0));
        assert!(number.is_empty());
        number.set_value(&json!(2.5)).unwrap();
        assert_eq!(number.value(), json!(2.5));
        number.set_value(&json!(30)).unwrap();
        assert_eq!(number.value(), json!(30));
        number.set_value(&Value::Null).unwrap();
        assert!(number.is_empty());

        let mut integer = Node::Leaf(leaf(json!({"type": "integer"})));
        integer.set_value(&json!(7)).unwrap();
        assert_eq!(integer.value(), json!(7));
        assert!(matches!(
            integer.set_value(&json!(7.5)),
            Err(SchemaError::TypeMismatch { .. })
        ));
        integer.set_value(&json!(8.0)).unwrap();
        assert_eq!(integer.value(), json!(8));
        assert!(matches!(
            integer.set_value(&json!(1e19)),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_boolean_field() {
        let mut node = Node::Leaf(leaf(json!({"type": "boolean"})));
        assert_eq!(node.value(), json!(false));
        assert!(!node.is_empty());
        node.set_value(&json!(true)).unwrap();
        assert_eq!(node.value(), json!(true));
    }

    #[test]
    fn test_date_field() {
        let mut node = Node::Leaf(leaf(json!({"type": "string", "format": "date"})));
        assert_eq!(node.as_leaf().unwrap().kind.name(), "date");
        assert!(node.is_empty());
        node.set_value(&json!("2024-02-29")).unwrap();
        assert_eq!(node.value(), json!("2024-02-29"));
        assert!(matches!(
            node.set_value(&json!("2023-02-29")),
            Err(SchemaError::TypeMismatch { .. })
        ));
        assert_eq!(node.value(), json!("2024-02-29"));
    }

    #[test]
    fn test_enum_rejects_unknown_value() {
        let mut node = Node::Leaf(leaf(json!({"type": "string", "enum": ["a", "b", "c"]})));
        assert_eq!(node.value(), Value::Null);
        assert!(node.is_empty());

        node.set_value(&json!("b")).unwrap();
        assert_eq!(node.value(), json!("b"));

        assert!(matches!(
            node.set_value(&json!("z")),
            Err(SchemaError::InvalidValue { .. })
        ));
        assert_eq!(node.value(), json!("b"));
    }

    #[test]
    fn test_enum_wins_over_type() {
        let node = leaf(json!({"type": "number", "enum": [1, 2]}));
        assert_eq!(node.kind.name(), "choice");
        assert_eq!(
            node.field_config().options,
            Some(vec![json!(1), json!(2)])
        );
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let mut node = Node::Leaf(leaf(
            json!({"type": "string", "readOnly": true, "default": "fixed"}),
        ));
        assert_eq!(node.value(), json!("fixed"));
        assert!(matches!(
            node.set_value(&json!("x")),
            Err(SchemaError::ReadOnlyViolation { .. })
        ));
        assert!(matches!(
            node.set_value(&json!("fixed")),
            Err(SchemaError::ReadOnlyViolation { .. })
        ));
        assert_eq!(node.value(), json!("fixed"));

        node.restore_value(&json!("loaded")).unwrap();
        assert_eq!(node.value(), json!("loaded"));
    }

    #[test]
    fn test_invalid_default() {
        assert!(matches!(
            build(&json!({"type": "number", "default": "x"})),
            Err(SchemaError::SchemaInvalid { .. })
        ));
    }

    #[test]
    fn test_multi_choice() {
        let mut node = build(&json!({
            "type": "array",
            "items": {"enum": ["red", "green", "blue"]}
        }))
        .unwrap();
        assert_eq!(node.as_leaf().unwrap().kind.name(), "multi-choice");
        assert_eq!(node.value(), json!([]));
        assert!(node.is_empty());

        node.set_value(&json!(["blue", "red"])).unwrap();
        assert_eq!(node.value(), json!(["blue", "red"]));
        assert!(matches!(
            node.set_value(&json!(["pink"])),
            Err(SchemaError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_field_config() {
        let leaf = LeafNode::from_config(
            "$.tags",
            FieldConfig::new("Tags")
                .with_required(true)
                .with_options(vec![json!("a")]),
            LeafKind::Choice(ChoiceItem::new(Vec::new())),
        );
        assert!(leaf.base.required);
        assert!(!leaf.read_only);
        assert_eq!(leaf.field_config().options, Some(vec![json!("a")]));
    }
}
