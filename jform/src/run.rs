use std::path::Path;

use anyhow::{Context, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::data::{FormData, FormEvent};

/// Load a config file through the form compiled from `schema` and return it
/// as a typed value.
///
/// Fields absent from the file read as the form's defaults.
///
/// # Errors
///
/// Returns errors when the schema does not compile, the file cannot be
/// parsed or does not fit the schema, or the value does not deserialize
/// into `C`.
pub fn load<C: DeserializeOwned>(schema: &Value, config_path: impl AsRef<Path>) -> anyhow::Result<C> {
    let config_path = config_path.as_ref();
    let app = FormData::new_with_schema(Some(config_path), schema)?;
    to_typed(app.root.value())
}

/// Run the edit workflow: load the config, apply `events` in order and save
/// when anything changed.
///
/// Returns `None` when no event changed the form. Nothing is written if any
/// event is rejected.
///
/// # Errors
///
/// Returns the first rejected event, or load/save/deserialize failures.
pub fn run<C: DeserializeOwned>(
    schema: &Value,
    config_path: impl AsRef<Path>,
    events: impl IntoIterator<Item = FormEvent>,
) -> anyhow::Result<Option<C>> {
    let config_path = config_path.as_ref();
    let mut app = FormData::new_with_schema(Some(config_path), schema)?;

    for event in events {
        app.post(event);
    }
    let results = app.process_events();
    let rejected = results.iter().filter(|r| r.is_err()).count();
    if let Some(Err(first)) = results.into_iter().find(|r| r.is_err()) {
        bail!("{rejected} event(s) rejected, first: {first}");
    }

    if !app.needs_save {
        return Ok(None);
    }
    app.on_exit()
        .with_context(|| format!("Failed to save {}", config_path.display()))?;

    to_typed(app.root.value()).map(Some)
}

fn to_typed<C: DeserializeOwned>(value: Value) -> anyhow::Result<C> {
    let c = serde_json::from_value::<C>(value)?;
    Ok(c)
}
