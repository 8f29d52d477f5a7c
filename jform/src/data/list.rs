use serde_json::Value;

use crate::data::{
    dispatch::{FieldContext, build_node},
    schema::{SchemaError, SchemaFragment, SchemaType},
    types::{ElementBase, Node, WriteMode, humanize},
};

/// Fixed controls rendered ahead of the items of every list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListControl {
    /// Append a new item.
    Add,
    /// Remove every selected item.
    RemoveSelected,
}

pub const LIST_CONTROLS: [ListControl; 2] = [ListControl::Add, ListControl::RemoveSelected];

/// Entry of the visible child sequence of a list: controls, then items.
#[derive(Debug, Clone, Copy)]
pub enum ListChild<'a> {
    Control(ListControl),
    Item(usize, &'a ListItem),
}

/// User action addressed to a list.
///
/// Hosts send these instead of wiring callbacks that capture an item
/// index, which would go stale as items are removed.
#[derive(Debug, Clone, PartialEq)]
pub enum ListCommand {
    AddItemRequested(Option<Value>),
    RemoveItemRequested(isize),
    RemoveSelectedRequested,
    SetSelected { index: isize, selected: bool },
    ClearRequested,
}

/// Result of a [`ListCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// A new item was appended at `index`.
    Added { index: usize },
    /// The add was refused because an existing item is still empty.
    AddRefused,
    /// `count` items were removed.
    Removed { count: usize },
    /// A selection flag changed.
    SelectionChanged,
}

/// One entry of a list: an inner node plus a selection flag.
#[derive(Debug, Clone)]
pub struct ListItem {
    inner: Node,
    selected: bool,
}

impl ListItem {
    fn new(inner: Node) -> Self {
        Self {
            inner,
            selected: false,
        }
    }

    pub fn inner(&self) -> &Node {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut Node {
        &mut self.inner
    }

    pub fn value(&self) -> Value {
        self.inner.value()
    }

    pub fn set_value(&mut self, value: &Value) -> Result<(), SchemaError> {
        self.inner.set_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

/// Resizable list of homogeneous sub-forms for `type: "array"` schemas.
#[derive(Debug, Clone)]
pub struct ListNode {
    /// Shared element metadata.
    pub base: ElementBase,
    item_schema: Value,
    prototype: Box<Node>,
    items: Vec<ListItem>,
}

impl ListNode {
    /// Build a list from the array fragment and its `items` schema.
    ///
    /// The item schema is copied and compiled once; every item is a fresh
    /// copy of that compiled prototype.
    pub(crate) fn build(
        fragment: &SchemaFragment,
        item_schema: &Value,
        ctx: FieldContext,
    ) -> Result<Self, SchemaError> {
        let item_schema = item_schema.clone();
        let prototype = build_node(&item_schema, ctx.item())?;

        let label = match (&fragment.title, &ctx.name) {
            (Some(title), _) => title.clone(),
            (None, Some(name)) => humanize(name),
            (None, None) => humanize(SchemaType::Array.as_str()),
        };
        debug!("list `{}` built for `{}` items", ctx.path, prototype.base().label);

        Ok(ListNode {
            base: ElementBase {
                path: ctx.path,
                name: ctx.name,
                label,
                description: fragment.description.clone(),
                required: ctx.required,
            },
            item_schema,
            prototype: Box::new(prototype),
            items: Vec::new(),
        })
    }

    /// Schema shared by all items.
    pub fn item_schema(&self) -> &Value {
        &self.item_schema
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    /// Controls followed by the items, as a renderer shows them.
    pub fn children(&self) -> Vec<ListChild<'_>> {
        LIST_CONTROLS
            .iter()
            .map(|c| ListChild::Control(*c))
            .chain(
                self.items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| ListChild::Item(i, item)),
            )
            .collect()
    }

    pub fn item(&self, index: isize) -> Result<&ListItem, SchemaError> {
        let idx = self.resolve_index(index)?;
        Ok(&self.items[idx])
    }

    pub fn item_mut(&mut self, index: isize) -> Result<&mut ListItem, SchemaError> {
        let idx = self.resolve_index(index)?;
        Ok(&mut self.items[idx])
    }

    /// Append a new item, optionally seeded with `initial`.
    ///
    /// Returns `Ok(false)` without adding anything while any existing item
    /// is still empty. A seed that does not fit the item schema is rejected
    /// and nothing is added.
    pub fn add_item(&mut self, initial: Option<&Value>) -> Result<bool, SchemaError> {
        if self.items.iter().any(ListItem::is_empty) {
            debug!("`{}`: add refused, an item is still empty", self.base.path);
            return Ok(false);
        }

        let mut inner = (*self.prototype).clone();
        if let Some(value) = initial {
            inner.set_value(value)?;
        }
        self.items.push(ListItem::new(inner));
        debug!("`{}`: item {} added", self.base.path, self.items.len() - 1);
        Ok(true)
    }

    /// Remove one item. Negative indexes count from the end.
    pub fn remove_item(&mut self, index: isize) -> Result<ListItem, SchemaError> {
        let idx = self.resolve_index(index)?;
        debug!("`{}`: item {idx} removed", self.base.path);
        Ok(self.items.remove(idx))
    }

    /// Remove every selected item and return how many were removed.
    pub fn remove_selected_items(&mut self) -> Result<usize, SchemaError> {
        let selected: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_selected())
            .map(|(i, _)| i)
            .collect();

        for &idx in selected.iter().rev() {
            self.remove_item(idx as isize)?;
        }
        Ok(selected.len())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn set_selected(&mut self, index: isize, selected: bool) -> Result<(), SchemaError> {
        self.item_mut(index)?.set_selected(selected);
        Ok(())
    }

    pub fn toggle_selected(&mut self, index: isize) -> Result<bool, SchemaError> {
        let item = self.item_mut(index)?;
        item.selected = !item.selected;
        Ok(item.selected)
    }

    /// Execute one host command.
    pub fn apply(&mut self, command: ListCommand) -> Result<ListOutcome, SchemaError> {
        match command {
            ListCommand::AddItemRequested(initial) => {
                if self.add_item(initial.as_ref())? {
                    Ok(ListOutcome::Added {
                        index: self.items.len() - 1,
                    })
                } else {
                    Ok(ListOutcome::AddRefused)
                }
            }
            ListCommand::RemoveItemRequested(index) => {
                self.remove_item(index)?;
                Ok(ListOutcome::Removed { count: 1 })
            }
            ListCommand::RemoveSelectedRequested => Ok(ListOutcome::Removed {
                count: self.remove_selected_items()?,
            }),
            ListCommand::SetSelected { index, selected } => {
                self.set_selected(index, selected)?;
                Ok(ListOutcome::SelectionChanged)
            }
            ListCommand::ClearRequested => {
                let count = self.items.len();
                self.clear();
                Ok(ListOutcome::Removed { count })
            }
        }
    }

    /// Ordered item values.
    pub fn value(&self) -> Value {
        Value::Array(self.items.iter().map(ListItem::value).collect())
    }

    /// Replace all items. A sequence adds one item per element; any other
    /// value adds exactly one item.
    pub fn set_value(&mut self, value: &Value) -> Result<(), SchemaError> {
        self.check_value(value, WriteMode::Edit)?;
        self.apply_value(value, WriteMode::Edit)
    }

    pub(crate) fn check_value(&self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        match value {
            Value::Array(values) => values
                .iter()
                .try_for_each(|v| self.prototype.check_value(v, mode)),
            _ => self.prototype.check_value(value, mode),
        }
    }

    // Bypasses the empty-item guard of `add_item`: the incoming value may
    // legitimately contain incomplete elements.
    pub(crate) fn apply_value(&mut self, value: &Value, mode: WriteMode) -> Result<(), SchemaError> {
        self.clear();
        let values = match value {
            Value::Array(values) => values.as_slice(),
            _ => std::slice::from_ref(value),
        };
        for v in values {
            let mut inner = (*self.prototype).clone();
            inner.apply_value(v, mode)?;
            self.items.push(ListItem::new(inner));
        }
        Ok(())
    }

    fn resolve_index(&self, index: isize) -> Result<usize, SchemaError> {
        let len = self.items.len();
        if index.unsigned_abs() >= len {
            return Err(SchemaError::IndexOutOfRange {
                path: self.base.path.clone(),
                index,
                len,
            });
        }
        Ok(if index < 0 {
            len - index.unsigned_abs()
        } else {
            index as usize
        })
    }
}
