//! Form tree data structures and schema compilation.
//!
//! This module turns a JSON Schema document into a tree of [`Node`]s and
//! keeps the tree's composite value synchronized with edits:
//!
//! - Schema parsing and validation
//! - Compilation of fragments into leaf, object and list nodes
//! - Value reads (bottom-up) and writes (top-down)
//! - A form session with path navigation, event queue and persistence
//!
//! ## Architecture
//!
//! - [`app_data`] - Form session: loading, events, saving
//! - [`dispatch`] - Type-keyed compiler from schema to tree
//! - [`leaf`] - Single-value fields
//! - [`list`] - Repeating lists of sub-forms
//! - [`object`] - Named collections of child fields
//! - [`schema`] - Schema fragments, validators and errors
//! - [`types`] - The [`Node`] sum type and shared metadata

/// Form session: loading, events and persistence.
pub mod app_data;

/// Schema-to-tree compiler.
pub mod dispatch;

/// Single-value leaf fields.
pub mod leaf;

/// Repeating lists of homogeneous sub-forms.
pub mod list;

/// Object composites.
pub mod object;

/// JSON Schema parsing, validation and error types.
pub mod schema;

/// Node sum type and shared element metadata.
pub mod types;

pub use app_data::{EventOutcome, FormData, FormEvent};
pub use dispatch::build;
pub use leaf::{FieldConfig, LeafKind, LeafNode};
pub use list::{ListCommand, ListItem, ListNode, ListOutcome};
pub use object::ObjectNode;
pub use schema::{InstanceValidator, SchemaError, SchemaValidator};
pub use types::{ElementBase, Node};
