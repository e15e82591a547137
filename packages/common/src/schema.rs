//! # Column Schema
//!
//! Every node carries the same fixed row of seven typed cells:
//!
//! ```text
//! | order | name | value | type | reference | id | description |
//! |  i32  | text | text  | text |  ItemId?  | ItemId? | text   |
//! ```
//!
//! The column keys double as attribute names in the exchange format.

use crate::error::CellError;
use crate::id::ItemId;
use crate::kind::ItemKind;
use crate::result::CellResult;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Order,
    Name,
    Value,
    Type,
    Reference,
    Id,
    Description,
}

impl Column {
    pub const COUNT: usize = 7;

    pub const ALL: [Column; Column::COUNT] = [
        Column::Order,
        Column::Name,
        Column::Value,
        Column::Type,
        Column::Reference,
        Column::Id,
        Column::Description,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Attribute key used by the exchange format
    pub fn key(self) -> &'static str {
        match self {
            Column::Order => "order",
            Column::Name => "name",
            Column::Value => "value",
            Column::Type => "type",
            Column::Reference => "reference",
            Column::Id => "id",
            Column::Description => "description",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.key() == key)
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Order => "Order",
            Column::Name => "Name",
            Column::Value => "Value",
            Column::Type => "Type",
            Column::Reference => "Reference",
            Column::Id => "Id",
            Column::Description => "Description",
        }
    }

    /// True for the two columns that feed the identity registry
    pub fn is_identity(self) -> bool {
        matches!(self, Column::Reference | Column::Id)
    }
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Order(i32),
    Identity(Option<ItemId>),
    Text(String),
}

impl CellValue {
    /// Parse user-entered text for the given column
    pub fn parse(column: Column, text: &str) -> CellResult<Self> {
        match column {
            Column::Order => text
                .trim()
                .parse::<i32>()
                .map(CellValue::Order)
                .map_err(|_| CellError::InvalidOrder(text.to_string())),
            Column::Reference | Column::Id => {
                if text.trim().is_empty() {
                    Ok(CellValue::Identity(None))
                } else {
                    ItemId::parse(text)
                        .map(|id| CellValue::Identity(Some(id)))
                        .ok_or_else(|| CellError::InvalidIdentity(text.to_string()))
                }
            }
            _ => Ok(CellValue::Text(text.to_string())),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            CellValue::Order(_) => "order",
            CellValue::Identity(_) => "identity",
            CellValue::Text(_) => "text",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_identity(&self) -> Option<ItemId> {
        match self {
            CellValue::Identity(id) => *id,
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Order(order) => write!(f, "{:03}", order),
            CellValue::Identity(Some(id)) => write!(f, "{}", id),
            CellValue::Identity(None) => Ok(()),
            CellValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        CellValue::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        CellValue::Text(text)
    }
}

impl From<i32> for CellValue {
    fn from(order: i32) -> Self {
        CellValue::Order(order)
    }
}

impl From<Option<ItemId>> for CellValue {
    fn from(id: Option<ItemId>) -> Self {
        CellValue::Identity(id)
    }
}

/// The fixed-width row of cells stored on every node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cells {
    pub order: i32,
    pub name: String,
    pub value: String,
    pub item_type: String,
    pub reference: Option<ItemId>,
    pub id: Option<ItemId>,
    pub description: String,
}

impl Cells {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// A plain name/value variant row
    pub fn variant(order: i32, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            order,
            ..Self::new(name, value)
        }
    }

    /// A preset row carrying a fresh identity
    pub fn preset(name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_type: item_type.into(),
            id: Some(ItemId::new()),
            ..Self::default()
        }
    }

    /// A reference row pointing at `target`
    pub fn reference(name: impl Into<String>, target: ItemId) -> Self {
        Self {
            name: name.into(),
            reference: Some(target),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = item_type.into();
        self
    }

    pub fn with_id(mut self, id: Option<ItemId>) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn get(&self, column: Column) -> CellValue {
        match column {
            Column::Order => CellValue::Order(self.order),
            Column::Name => CellValue::Text(self.name.clone()),
            Column::Value => CellValue::Text(self.value.clone()),
            Column::Type => CellValue::Text(self.item_type.clone()),
            Column::Reference => CellValue::Identity(self.reference),
            Column::Id => CellValue::Identity(self.id),
            Column::Description => CellValue::Text(self.description.clone()),
        }
    }

    /// Write a cell and hand back the value it replaced
    pub fn set(&mut self, column: Column, value: CellValue) -> CellResult<CellValue> {
        let previous = self.get(column);
        match (column, value) {
            (Column::Order, CellValue::Order(order)) => self.order = order,
            (Column::Reference, CellValue::Identity(id)) => self.reference = id,
            (Column::Id, CellValue::Identity(id)) => self.id = id,
            (Column::Name, CellValue::Text(text)) => self.name = text,
            (Column::Value, CellValue::Text(text)) => self.value = text,
            (Column::Type, CellValue::Text(text)) => self.item_type = text,
            (Column::Description, CellValue::Text(text)) => self.description = text,
            (column, value) => {
                return Err(CellError::TypeMismatch {
                    column,
                    found: value.type_name(),
                })
            }
        }
        Ok(previous)
    }

    /// Text shown for a column
    pub fn display(&self, column: Column) -> String {
        self.get(column).to_string()
    }

    pub fn kind(&self) -> ItemKind {
        ItemKind::derive(self)
    }
}
