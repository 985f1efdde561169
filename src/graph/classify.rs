//! Table Classification
//!
//! Decides per table whether it is an entity table or a join (associative)
//! table. Purely local: only the table's own columns are inspected.

use serde::{Deserialize, Serialize};

use crate::schema::TableDefinition;

/// Number of foreign keys that makes a table a join table.
///
/// Association tables with three or more foreign keys are entity tables.
pub const JOIN_TABLE_FOREIGN_KEYS: usize = 2;

/// What role a table plays in the diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Anything that is not a join table
    Entity,
    /// Exactly two foreign keys; represents a many-to-many link
    Join,
}

impl TableKind {
    pub fn is_join(self) -> bool {
        matches!(self, TableKind::Join)
    }
}

/// A table paired with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTable {
    pub table: TableDefinition,
    pub kind: TableKind,
}

/// Count columns flagged as foreign keys
pub fn foreign_key_count(table: &TableDefinition) -> usize {
    table.foreign_keys().count()
}

/// Classify a single table
pub fn classify(table: &TableDefinition) -> TableKind {
    if foreign_key_count(table) == JOIN_TABLE_FOREIGN_KEYS {
        TableKind::Join
    } else {
        TableKind::Entity
    }
}

/// Classify every table, preserving snapshot order
pub fn classify_all(tables: Vec<TableDefinition>) -> Vec<ClassifiedTable> {
    tables
        .into_iter()
        .map(|table| {
            let kind = classify(&table);
            ClassifiedTable { table, kind }
        })
        .collect()
}
