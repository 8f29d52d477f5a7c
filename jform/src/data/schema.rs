//! JSON Schema fragment parsing and validation.
//!
//! A [`SchemaFragment`] is the typed view of one node of the input schema
//! document. [`SchemaValidator`] checks a whole document against the JSON
//! Schema meta-schema before anything is compiled, and [`InstanceValidator`]
//! lets hosts check a form value against its schema.

use jsonschema::ValidationError;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Path of the root node in error messages and element keys.
pub const ROOT_PATH: &str = "$";

/// Errors raised while compiling a schema or accessing form values.
///
/// Every variant carries the dotted path of the node involved. List items
/// appear as `name[]` because their index changes as items are removed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The document fails structural validation.
    #[error("invalid schema at `{path}`: {reason}")]
    SchemaInvalid { path: String, reason: String },

    /// Keys such as `type`, `properties` or `items` are absent.
    #[error("schema at `{path}` is missing: {}", .fields.join(", "))]
    SchemaMissingFields { path: String, fields: Vec<String> },

    /// Unrecognised `type` or an unsupported combinator such as `oneOf`.
    #[error("unsupported schema at `{path}`: {reason}")]
    UnsupportedSchema { path: String, reason: String },

    /// A value write names a key the object schema does not declare.
    #[error("unknown property `{key}` for `{path}`")]
    UnknownProperty { path: String, key: String },

    /// A value write targets a read-only leaf.
    #[error("`{path}` is read-only")]
    ReadOnlyViolation { path: String },

    /// Item access beyond the current item count.
    #[error("index {index} out of range for `{path}` ({len} items)")]
    IndexOutOfRange {
        path: String,
        index: isize,
        len: usize,
    },

    /// A value outside the enumerated options of a choice field.
    #[error("`{path}` expects one of {options}, got {value}")]
    InvalidValue {
        path: String,
        value: String,
        options: String,
    },

    /// A value of the wrong JSON kind.
    #[error("type mismatch at `{path}`: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Navigation to a path that does not exist in the tree.
    #[error("no element at `{path}`")]
    PathNotFound { path: String },
}

impl SchemaError {
    pub(crate) fn type_mismatch(path: &str, expected: impl Into<String>, actual: &Value) -> Self {
        SchemaError::TypeMismatch {
            path: path.to_string(),
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn invalid_value(path: &str, value: &Value, options: &[Value]) -> Self {
        SchemaError::InvalidValue {
            path: path.to_string(),
            value: value.to_string(),
            options: Value::Array(options.to_vec()).to_string(),
        }
    }

    fn from_validation(err: ValidationError<'_>) -> Self {
        SchemaError::SchemaInvalid {
            path: pointer_to_path(err.instance_path.as_str()),
            reason: err.to_string(),
        }
    }
}

/// Value types the dispatcher knows how to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl SchemaType {
    /// Parse a `type` keyword value. Returns `None` for types with no form
    /// representation (`null`) or unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "string" => SchemaType::String,
            "number" => SchemaType::Number,
            "integer" => SchemaType::Integer,
            "boolean" => SchemaType::Boolean,
            "object" => SchemaType::Object,
            "array" => SchemaType::Array,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
        }
    }
}

/// Typed view of a single schema node.
///
/// Only the keywords the compiler acts on are captured; everything else in
/// the document is left to the validators.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFragment {
    #[serde(rename = "type")]
    pub ty: Option<Value>,
    #[serde(rename = "enum")]
    pub enumeration: Option<Vec<Value>>,
    pub properties: Option<Map<String, Value>>,
    pub items: Option<Value>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub read_only: bool,
    pub one_of: Option<Vec<Value>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub format: Option<String>,
}

impl SchemaFragment {
    /// Read the fragment at `path` out of a schema value.
    pub fn parse(schema: &Value, path: &str) -> Result<Self, SchemaError> {
        if !schema.is_object() {
            return Err(SchemaError::SchemaInvalid {
                path: path.to_string(),
                reason: format!("expected a JSON object, got {schema}"),
            });
        }
        serde_json::from_value(schema.clone()).map_err(|e| SchemaError::SchemaInvalid {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Resolve the `type` discriminator.
    pub fn schema_type(&self, path: &str) -> Result<SchemaType, SchemaError> {
        if self.one_of.is_some() {
            return Err(SchemaError::UnsupportedSchema {
                path: path.to_string(),
                reason: "`oneOf` is not supported".to_string(),
            });
        }
        match &self.ty {
            None => Err(SchemaError::SchemaMissingFields {
                path: path.to_string(),
                fields: vec!["type".to_string()],
            }),
            Some(Value::String(s)) => {
                SchemaType::parse(s).ok_or_else(|| SchemaError::UnsupportedSchema {
                    path: path.to_string(),
                    reason: format!("unknown type `{s}`"),
                })
            }
            Some(other) => Err(SchemaError::UnsupportedSchema {
                path: path.to_string(),
                reason: format!("type unions are not supported: {other}"),
            }),
        }
    }

    /// Whether `name` is listed in this object's `required` keyword.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Structural validation of schema documents.
pub struct SchemaValidator;

impl SchemaValidator {
    /// Check `schema` against the JSON Schema meta-schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaInvalid`] when the document is not a
    /// JSON object, names an unknown `$schema` or violates the meta-schema.
    pub fn check_schema(schema: &Value) -> Result<(), SchemaError> {
        if !schema.is_object() {
            return Err(SchemaError::SchemaInvalid {
                path: ROOT_PATH.to_string(),
                reason: "schema document must be a JSON object".to_string(),
            });
        }
        jsonschema::meta::try_validate(schema)
            .map_err(|e| SchemaError::SchemaInvalid {
                path: ROOT_PATH.to_string(),
                reason: e.to_string(),
            })?
            .map_err(SchemaError::from_validation)
    }
}

/// Validation of data instances against a schema.
///
/// Not used by the compiler itself; hosts call it before saving.
pub struct InstanceValidator {
    validator: jsonschema::Validator,
}

impl InstanceValidator {
    /// Compile `schema` for repeated instance checks.
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(schema).map_err(SchemaError::from_validation)?;
        Ok(Self { validator })
    }

    /// One-shot check of `instance` against `schema`.
    pub fn validate(instance: &Value, schema: &Value) -> Result<bool, SchemaError> {
        Ok(Self::new(schema)?.is_valid(instance))
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// List every violation as `(path, message)`.
    pub fn violations(&self, instance: &Value) -> Vec<(String, String)> {
        self.validator
            .iter_errors(instance)
            .map(|e| (pointer_to_path(e.instance_path.as_str()), e.to_string()))
            .collect()
    }
}

/// Convert a JSON pointer (`/people/0/name`) into a dotted path (`$.people.0.name`).
fn pointer_to_path(pointer: &str) -> String {
    let mut path = ROOT_PATH.to_string();
    for seg in pointer.split('/').skip(1) {
        path.push('.');
        path.push_str(&seg.replace("~1", "/").replace("~0", "~"));
    }
    path
}
