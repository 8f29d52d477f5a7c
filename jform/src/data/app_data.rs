use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, bail};
use serde_json::Value;

use crate::data::{
    dispatch::build,
    list::{ListCommand, ListOutcome},
    schema::{InstanceValidator, ROOT_PATH, SchemaError},
    types::Node,
};

/// A user action addressed to the node at `path` (dot-separated, list items
/// by index, e.g. `people.0.name`).
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// A field edit.
    Edit { path: String, value: Value },
    /// A list action (add, remove, select, clear).
    List { path: String, command: ListCommand },
}

/// What an applied [`FormEvent`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Edited,
    List(ListOutcome),
}

/// Form session: the compiled tree plus the state a host needs around it.
#[derive(Debug, Clone)]
pub struct FormData {
    /// Root of the compiled form tree.
    pub root: Node,
    /// Schema the tree was compiled from.
    pub schema: Value,
    /// Current navigation path as a list of keys.
    pub current_key: Vec<String>,
    /// Whether the form has unsaved changes.
    pub needs_save: bool,
    /// Path to the configuration file.
    pub config: PathBuf,
    events: VecDeque<FormEvent>,
}

const DEFAULT_CONFIG_PATH: &str = ".config.toml";

/// Derive a default schema path from a config path:
/// `dir/config.toml` -> `dir/config-schema.json`.
pub fn default_schema_by_init(config: &Path) -> PathBuf {
    let binding = config
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name_split = binding.split('.').collect::<Vec<_>>();
    if name_split.len() > 1 {
        name_split.pop();
    }

    let name = format!("{}-schema.json", name_split.join("."));

    if let Some(parent) = config.parent() {
        parent.join(name)
    } else {
        PathBuf::from(name)
    }
}

/// Parse config file content according to its extension.
pub fn parse_content(content: &str, ext: &str) -> anyhow::Result<Value> {
    let value = match ext {
        "json" => serde_json::from_str(content)?,
        "toml" | "tml" => {
            let v: toml::Value = toml::from_str(content)?;
            serde_json::to_value(v)?
        }
        _ => bail!("Unsupported config file extension: {ext:?}"),
    };
    Ok(value)
}

/// Serialize a form value according to the config file extension.
///
/// TOML has no null, so unset fields are omitted there.
pub fn render_content(value: &Value, ext: &str) -> anyhow::Result<String> {
    let s = match ext {
        "toml" | "tml" => toml::to_string_pretty(&strip_nulls(value))?,
        "json" => serde_json::to_string_pretty(value)?,
        _ => bail!("Unsupported config file extension: {ext:?}"),
    };
    Ok(s)
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        Value::Array(values) => Value::Array(
            values
                .iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other.clone(),
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

/// Session paths may be written with or without the `$` root marker.
fn node_key(path: &str) -> &str {
    if path == ROOT_PATH {
        ""
    } else {
        path.strip_prefix("$.").unwrap_or(path)
    }
}

impl FormData {
    /// Build a session from optional config and schema paths.
    ///
    /// When schema is not provided, it is derived from the config path.
    pub fn new(
        config: Option<impl AsRef<Path>>,
        schema: Option<impl AsRef<Path>>,
    ) -> anyhow::Result<Self> {
        let init_value_path = Self::init_value_path(config);

        let schema_path = if let Some(sch) = schema {
            sch.as_ref().to_path_buf()
        } else {
            default_schema_by_init(&init_value_path)
        };

        if !schema_path.exists() {
            bail!("Schema file does not exist: {}", schema_path.display());
        }

        let schema_content = fs::read_to_string(&schema_path)
            .with_context(|| format!("Failed to read {}", schema_path.display()))?;
        let schema_json: Value = serde_json::from_str(&schema_content)?;
        Self::new_with_schema(Some(init_value_path), &schema_json)
    }

    fn init_value_path(config: Option<impl AsRef<Path>>) -> PathBuf {
        let mut init_value_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if let Some(cfg) = config {
            init_value_path = cfg.as_ref().to_path_buf();
        }
        init_value_path
    }

    /// Build a session from already-loaded config content and a schema.
    ///
    /// Values from `init` fill the tree, including read-only fields.
    pub fn new_with_init_and_schema(
        init: &str,
        init_value_path: &Path,
        schema: &Value,
    ) -> anyhow::Result<Self> {
        let mut root = build(schema)?;

        if !init.trim().is_empty() {
            let init_json = parse_content(init, extension(init_value_path))?;
            root.restore_value(&init_json)
                .with_context(|| format!("Failed to load {}", init_value_path.display()))?;
        }

        Ok(FormData {
            root,
            schema: schema.clone(),
            current_key: Vec::new(),
            needs_save: false,
            config: init_value_path.into(),
            events: VecDeque::new(),
        })
    }

    /// Build a session from a schema and an optional config path.
    ///
    /// If the config file exists, it is loaded to initialize values.
    pub fn new_with_schema(
        config: Option<impl AsRef<Path>>,
        schema: &Value,
    ) -> anyhow::Result<Self> {
        let init_value_path = Self::init_value_path(config);

        let init_content = if init_value_path.exists() {
            fs::read_to_string(&init_value_path)
                .with_context(|| format!("Failed to read {}", init_value_path.display()))?
        } else {
            String::new()
        };

        Self::new_with_init_and_schema(&init_content, &init_value_path, schema)
    }

    /// Persist changes and create a timestamped backup when needed.
    pub fn on_exit(&mut self) -> anyhow::Result<()> {
        if !self.needs_save {
            return Ok(());
        }
        let ext = extension(&self.config);
        let s = render_content(&self.root.value(), ext)?;

        if self.config.exists() {
            let bk = format!(
                "bk-{:?}.{ext}",
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)?
                    .as_secs()
            );

            let backup_path = self.config.with_extension(bk);
            fs::copy(&self.config, &backup_path)?;
            debug!("backup written to {}", backup_path.display());
        }
        fs::write(&self.config, s)
            .with_context(|| format!("Failed to write {}", self.config.display()))?;
        info!("form saved to {}", self.config.display());
        self.needs_save = false;
        Ok(())
    }

    /// Check the current value against the schema.
    ///
    /// Returns every violation as `(path, message)`; empty when valid.
    pub fn validate_instance(&self) -> Result<Vec<(String, String)>, SchemaError> {
        let validator = InstanceValidator::new(&self.schema)?;
        Ok(validator.violations(&self.root.value()))
    }

    /// Queue an event for [`FormData::process_events`].
    pub fn post(&mut self, event: FormEvent) {
        self.events.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Apply queued events one at a time, in arrival order.
    pub fn process_events(&mut self) -> Vec<Result<EventOutcome, SchemaError>> {
        let mut results = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop_front() {
            let result = self.handle(event);
            if let Err(e) = &result {
                warn!("event rejected: {e}");
            }
            results.push(result);
        }
        results
    }

    /// Apply a single event immediately.
    ///
    /// The session is marked for saving only when the form value changed.
    pub fn handle(&mut self, event: FormEvent) -> Result<EventOutcome, SchemaError> {
        let before = self.root.value();
        let outcome = match event {
            FormEvent::Edit { path, value } => {
                self.node_mut(&path)?.set_value(&value)?;
                EventOutcome::Edited
            }
            FormEvent::List { path, command } => match self.node_mut(&path)? {
                Node::List(list) => EventOutcome::List(list.apply(command)?),
                other => {
                    return Err(SchemaError::TypeMismatch {
                        path,
                        expected: "list".to_string(),
                        actual: other.value().to_string(),
                    });
                }
            },
        };
        if self.root.value() != before {
            self.needs_save = true;
        }
        Ok(outcome)
    }

    fn node_mut(&mut self, path: &str) -> Result<&mut Node, SchemaError> {
        self.root
            .get_mut_by_key(node_key(path))
            .ok_or_else(|| SchemaError::PathNotFound {
                path: path.to_string(),
            })
    }

    /// Get the node at a dot-separated path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        self.root.get_by_key(node_key(path))
    }

    /// Enter a path (dot-separated).
    pub fn enter(&mut self, key: &str) {
        if key.is_empty() {
            return;
        }
        self.current_key = node_key(key).split('.').map(|s| s.to_string()).collect();
    }

    /// Push a field name or item index onto the current path.
    pub fn push_field(&mut self, f: &str) {
        self.current_key.push(f.to_string());
    }

    /// Navigate back to the parent path.
    pub fn navigate_back(&mut self) {
        if !self.current_key.is_empty() {
            self.current_key.pop();
        }
    }

    /// Return the current path as a dot-separated string.
    pub fn key_string(&self) -> String {
        if self.current_key.is_empty() {
            return String::new();
        }

        self.current_key.join(".")
    }

    /// Get the node at the current path.
    pub fn current(&self) -> Option<&Node> {
        self.root.get_by_key(&self.key_string())
    }

    /// Get the mutable node at the current path.
    pub fn current_mut(&mut self) -> Option<&mut Node> {
        let key = self.key_string();
        self.root.get_mut_by_key(&key)
    }
}
