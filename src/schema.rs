//! Raw table and column records as authored in the designer
//!
//! These mirror the snapshot JSON one-to-one (camelCase field names). Every
//! field is optional on input so that a partially-filled diagram still loads.

use serde::{Deserialize, Serialize};

/// Target of a foreign-key column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignReference {
    /// Referenced table name (matches [`TableDefinition::name`])
    #[serde(default)]
    pub table: String,
    /// Referenced column name
    #[serde(default)]
    pub column: String,
}

impl ForeignReference {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// A column ("property") of a table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    /// Property name used in generated code
    #[serde(default)]
    pub name: String,
    /// Storage column name
    #[serde(default)]
    pub column_name: String,
    #[serde(default)]
    pub description: String,
    /// Declared type, free-form (e.g. "int", "string", "DateTime")
    #[serde(default, rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub has_change_method: bool,
    /// Only meaningful when `is_foreign_key` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign: Option<ForeignReference>,
}

impl ColumnDefinition {
    /// Create a plain column
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            column_name: name.clone(),
            name,
            column_type: column_type.into(),
            ..Self::default()
        }
    }

    /// Create a foreign-key column referencing `table.column`
    pub fn foreign_key(
        name: impl Into<String>,
        column_type: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            is_foreign_key: true,
            is_required: true,
            foreign: Some(ForeignReference::new(table, column)),
            ..Self::new(name, column_type)
        }
    }

    /// Mark as primary key
    pub fn primary(mut self) -> Self {
        self.is_primary_key = true;
        self.is_required = true;
        self
    }

    /// Referenced table, if this column is a foreign key with a target
    pub fn references(&self) -> Option<&str> {
        if !self.is_foreign_key {
            return None;
        }
        self.foreign.as_ref().map(|f| f.table.as_str())
    }
}

/// A table ("class table") as stored in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    /// Class name used in generated code
    #[serde(default)]
    pub name: String,
    /// Storage table name
    #[serde(default)]
    pub table_name: String,
    /// Columns in declaration order
    #[serde(default, rename = "properties")]
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        let name = name.into();
        Self {
            table_name: name.clone(),
            name,
            columns,
        }
    }

    /// Foreign-key columns in declaration order
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.is_foreign_key)
    }

    /// Primary-key columns in declaration order
    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.is_primary_key)
    }

    /// Look up a column by property name
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Top-level shape of a snapshot file: `{ "data": { "classTables": [...] } }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub data: SnapshotData,
}

/// Payload of a snapshot file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotData {
    #[serde(default)]
    pub class_tables: Vec<TableDefinition>,
}

impl SnapshotDocument {
    /// Parse snapshot JSON
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Consume the document, returning its tables
    pub fn into_tables(self) -> Vec<TableDefinition> {
        self.data.class_tables
    }
}
