//! # jform
//!
//! Compile JSON Schema documents into editable form trees and keep the
//! form's composite value synchronized with user edits.
//!
//! jform owns no display surface. A host (TUI, web page, notebook widget)
//! renders the node tree and sends edits and list commands back.
//!
//! ## Features
//!
//! - Schema checked against the JSON Schema meta-schema before compiling
//! - Field types: String, Number, Integer, Boolean, Date, Enum, multi-select
//! - Objects with ordered, required-aware children
//! - Repeating lists of sub-forms with add, remove and batch removal
//! - Atomic value writes with typed errors (read-only, unknown keys, ...)
//! - TOML and JSON configuration files with automatic backup on save
//!
//! ## Quick Start
//!
//! ```rust
//! use jform::{ListCommand, build};
//! use serde_json::json;
//!
//! let mut form = build(&json!({
//!     "type": "array",
//!     "items": {"type": "object", "properties": {"x": {"type": "string"}}}
//! }))
//! .unwrap();
//!
//! let list = form.as_list_mut().unwrap();
//! list.apply(ListCommand::AddItemRequested(Some(json!({"x": "a"})))).unwrap();
//! list.apply(ListCommand::AddItemRequested(Some(json!({"x": "b"})))).unwrap();
//! assert_eq!(form.value(), json!([{"x": "a"}, {"x": "b"}]));
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Form tree, schema compilation and the form session
//! - [`run`] - Load/edit/save workflows for config files

#[macro_use]
extern crate log;

/// Form tree data structures and schema compilation.
///
/// This module provides the node types, the schema compiler and the form
/// session that hosts drive.
pub mod data;

/// Config file workflows built on the form session.
pub mod run;

pub use data::*;
pub use run::{load, run};
pub use serde_json::Value;
