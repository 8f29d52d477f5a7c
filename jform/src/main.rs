use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use jform::{FormData, FormEvent, ListCommand, Value, build};
use log::info;

#[derive(Parser)]
#[command(name = "jform", version, about = "Compile JSON Schema documents into editable forms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema and report whether it is usable as a form.
    Check {
        /// Schema file (JSON).
        schema: PathBuf,
    },
    /// Print the component tree of a schema.
    Outline {
        schema: PathBuf,
        /// Load values from this config file first.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the form value after loading a config file.
    Show { schema: PathBuf, config: PathBuf },
    /// Check a config file against its schema.
    Validate { schema: PathBuf, config: PathBuf },
    /// Edit a config file and save it (with backup).
    ///
    /// Removals run first, then additions, then field edits.
    Edit {
        schema: PathBuf,
        config: PathBuf,
        /// Remove list item, `PATH:INDEX` (negative counts from the end).
        #[arg(long = "remove", value_name = "PATH:INDEX")]
        remove: Vec<String>,
        /// Append a list item, `PATH` or `PATH=JSON`.
        #[arg(long = "add", value_name = "PATH[=JSON]")]
        add: Vec<String>,
        /// Set a field, `PATH=JSON` (bare text is taken as a string).
        #[arg(long = "set", value_name = "PATH=JSON")]
        set: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { schema } => {
            let schema = read_schema(&schema)?;
            let node = build(&schema)?;
            println!("ok: {}", node.base().label);
        }
        Commands::Outline { schema, config } => {
            let schema = read_schema(&schema)?;
            let node = match config {
                Some(config) => FormData::new_with_schema(Some(config), &schema)?.root,
                None => build(&schema)?,
            };
            print!("{}", node.outline());
        }
        Commands::Show { schema, config } => {
            let app = FormData::new_with_schema(Some(config), &read_schema(&schema)?)?;
            println!("{}", serde_json::to_string_pretty(&app.root.value())?);
        }
        Commands::Validate { schema, config } => {
            let app = FormData::new_with_schema(Some(&config), &read_schema(&schema)?)?;
            let violations = app.validate_instance()?;
            if violations.is_empty() {
                println!("{}: valid", config.display());
            } else {
                for (path, message) in &violations {
                    println!("{path}: {message}");
                }
                bail!("{} violation(s) in {}", violations.len(), config.display());
            }
        }
        Commands::Edit {
            schema,
            config,
            remove,
            add,
            set,
        } => {
            let mut app = FormData::new_with_schema(Some(&config), &read_schema(&schema)?)?;
            for arg in &remove {
                app.post(parse_remove(arg)?);
            }
            for arg in &add {
                app.post(parse_add(arg));
            }
            for arg in &set {
                app.post(parse_set(arg)?);
            }

            let mut failed = 0;
            for result in app.process_events() {
                match result {
                    Ok(outcome) => info!("{outcome:?}"),
                    Err(e) => {
                        eprintln!("rejected: {e}");
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} edit(s) rejected, {} left unchanged", config.display());
            }
            app.on_exit()?;
            println!("{}", serde_json::to_string_pretty(&app.root.value())?);
        }
    }
    Ok(())
}

fn read_schema(path: &Path) -> anyhow::Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let schema = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(schema)
}

fn parse_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

fn parse_set(arg: &str) -> anyhow::Result<FormEvent> {
    let (path, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected PATH=VALUE, got {arg:?}"))?;
    Ok(FormEvent::Edit {
        path: path.to_string(),
        value: parse_value(value),
    })
}

fn parse_add(arg: &str) -> FormEvent {
    let (path, initial) = match arg.split_once('=') {
        Some((path, value)) => (path, Some(parse_value(value))),
        None => (arg, None),
    };
    FormEvent::List {
        path: path.to_string(),
        command: ListCommand::AddItemRequested(initial),
    }
}

fn parse_remove(arg: &str) -> anyhow::Result<FormEvent> {
    let (path, index) = arg
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("expected PATH:INDEX, got {arg:?}"))?;
    let index = index
        .parse::<isize>()
        .with_context(|| format!("invalid index in {arg:?}"))?;
    Ok(FormEvent::List {
        path: path.to_string(),
        command: ListCommand::RemoveItemRequested(index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_set() {
        assert_eq!(
            parse_set("people.0.age=30").unwrap(),
            FormEvent::Edit {
                path: "people.0.age".to_string(),
                value: json!(30),
            }
        );
        assert_eq!(
            parse_set("name=Ann Lee").unwrap(),
            FormEvent::Edit {
                path: "name".to_string(),
                value: json!("Ann Lee"),
            }
        );
        assert!(parse_set("name").is_err());
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse_add("people"),
            FormEvent::List {
                path: "people".to_string(),
                command: ListCommand::AddItemRequested(None),
            }
        );
        assert_eq!(
            parse_add(r#"people={"x":"a"}"#),
            FormEvent::List {
                path: "people".to_string(),
                command: ListCommand::AddItemRequested(Some(json!({"x": "a"}))),
            }
        );
    }

    #[test]
    fn test_parse_remove() {
        assert_eq!(
            parse_remove("people:-1").unwrap(),
            FormEvent::List {
                path: "people".to_string(),
                command: ListCommand::RemoveItemRequested(-1),
            }
        );
        assert!(parse_remove("people").is_err());
        assert!(parse_remove("people:x").is_err());
    }
}
