//! Schema Graph
//!
//! The enriched, immutable view of one snapshot: every table annotated with
//! its classification and many-to-many relations, plus a petgraph view with
//! one edge per join-table foreign key (join table → entity table).
//!
//! Code generators read the annotated tables; the graph view backs
//! counterpart lookups and DOT export.

pub mod classify;
pub mod resolve;

pub use classify::{
    classify, classify_all, foreign_key_count, ClassifiedTable, TableKind, JOIN_TABLE_FOREIGN_KEYS,
};
pub use resolve::RelationResolver;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

use crate::schema::{ColumnDefinition, TableDefinition};

/// Which side of a join table a foreign key sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    First,
    Second,
}

/// Edge from a join table to the entity one of its foreign keys references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub side: Side,
    /// Foreign-key column on the join table
    pub column: String,
}

/// A table with derived relation attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTable {
    #[serde(flatten)]
    pub(crate) table: TableDefinition,
    pub(crate) is_join_table: bool,
    pub(crate) has_relations: bool,
    /// Names of join tables referencing this table (entity tables only)
    pub(crate) related_join_tables: Vec<String>,
    pub(crate) first_side: Option<ColumnDefinition>,
    pub(crate) second_side: Option<ColumnDefinition>,
}

impl ResolvedTable {
    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// The table as authored
    pub fn definition(&self) -> &TableDefinition {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.table.columns
    }

    pub fn kind(&self) -> TableKind {
        if self.is_join_table {
            TableKind::Join
        } else {
            TableKind::Entity
        }
    }

    pub fn is_join_table(&self) -> bool {
        self.is_join_table
    }

    /// At least one join table references this table
    pub fn has_relations(&self) -> bool {
        self.has_relations
    }

    pub fn related_join_table_names(&self) -> &[String] {
        &self.related_join_tables
    }

    /// First foreign key of a join table, in declaration order
    pub fn first_side(&self) -> Option<&ColumnDefinition> {
        self.first_side.as_ref()
    }

    /// Second foreign key of a join table, in declaration order
    pub fn second_side(&self) -> Option<&ColumnDefinition> {
        self.second_side.as_ref()
    }

    /// Name of the table on the opposite side from `entity`.
    ///
    /// For a self-referencing join table this is `entity` itself. `None` for
    /// entity tables or join tables not touching `entity`.
    pub fn counterpart_name(&self, entity: &str) -> Option<&str> {
        let first = self.first_side()?.references();
        let second = self.second_side()?.references();
        match (first, second) {
            (Some(f), Some(s)) if f == entity => Some(s),
            (Some(f), Some(s)) if s == entity => Some(f),
            _ => None,
        }
    }
}

/// Annotated tables of one snapshot
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    /// Join table → entity table, one edge per foreign key
    pub(crate) graph: DiGraph<String, RelationEdge>,

    /// All tables, snapshot order
    pub(crate) tables: Vec<ResolvedTable>,

    /// Index: table name -> position in `tables` (first occurrence)
    pub(crate) by_name: HashMap<String, usize>,

    /// Node index per table, parallel to `tables` (node `i` is table `i`)
    pub(crate) node_indices: Vec<NodeIndex>,
}

impl Default for SchemaGraph {
    fn default() -> Self {
        Self::from_tables(Vec::new())
    }
}

impl Serialize for SchemaGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.tables)
    }
}

impl SchemaGraph {
    /// Classify and resolve raw snapshot tables
    pub fn from_tables(tables: Vec<TableDefinition>) -> Self {
        RelationResolver::new().resolve(classify_all(tables))
    }

    // ========== Public API ==========

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All tables in snapshot order
    pub fn tables(&self) -> &[ResolvedTable] {
        &self.tables
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&ResolvedTable> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    pub fn entity_tables(&self) -> impl Iterator<Item = &ResolvedTable> {
        self.tables.iter().filter(|t| !t.is_join_table)
    }

    pub fn join_tables(&self) -> impl Iterator<Item = &ResolvedTable> {
        self.tables.iter().filter(|t| t.is_join_table)
    }

    /// Join tables referencing `name`, as full records
    pub fn related_join_tables(&self, name: &str) -> Vec<&ResolvedTable> {
        self.table(name)
            .map(|t| {
                t.related_join_tables
                    .iter()
                    .filter_map(|join| self.table(join))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entity on the other side of `join` as seen from `entity`
    pub fn counterpart(&self, entity: &str, join: &str) -> Option<&ResolvedTable> {
        let join = self.table(join).filter(|t| t.is_join_table)?;
        self.table(join.counterpart_name(entity)?)
    }

    /// Entity tables a join table connects, following graph edges
    pub fn endpoints(&self, join: &str) -> Vec<(&RelationEdge, &ResolvedTable)> {
        let Some(&i) = self.by_name.get(join) else {
            return Vec::new();
        };

        let mut endpoints: Vec<_> = self
            .graph
            .edges_directed(self.node_indices[i], Direction::Outgoing)
            .filter_map(|e| Some((e.weight(), self.tables.get(e.target().index())?)))
            .collect();
        endpoints.sort_by_key(|(edge, _)| edge.side);
        endpoints
    }

    /// Render as Graphviz DOT
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph SchemaGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        for (table, &idx) in self.tables.iter().zip(&self.node_indices) {
            let (shape, color) = match table.kind() {
                TableKind::Entity => ("box", "#00BCD4"),
                TableKind::Join => ("diamond", "#FF9800"),
            };
            output.push_str(&format!(
                "  n{} [label=\"{}\", shape={}, fillcolor=\"{}\"];\n",
                idx.index(),
                escape_label(table.name()),
                shape,
                color
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            output.push_str(&format!(
                "  n{} -> n{} [label=\"{}\"];\n",
                edge.source().index(),
                edge.target().index(),
                escape_label(&edge.weight().column)
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_role_graph() -> SchemaGraph {
        SchemaGraph::from_tables(vec![
            TableDefinition::new("User", vec![ColumnDefinition::new("Id", "int").primary()]),
            TableDefinition::new("Role", vec![ColumnDefinition::new("Id", "int").primary()]),
            TableDefinition::new(
                "UserRole",
                vec![
                    ColumnDefinition::foreign_key("UserId", "int", "User", "Id"),
                    ColumnDefinition::foreign_key("RoleId", "int", "Role", "Id"),
                ],
            ),
        ])
    }

    #[test]
    fn test_counterpart() {
        let graph = user_role_graph();
        assert_eq!(graph.counterpart("User", "UserRole").map(|t| t.name()), Some("Role"));
        assert_eq!(graph.counterpart("Role", "UserRole").map(|t| t.name()), Some("User"));
        assert!(graph.counterpart("Order", "UserRole").is_none());
        assert!(graph.counterpart("User", "Role").is_none());
    }

    #[test]
    fn test_endpoints_ordered_by_side() {
        let graph = user_role_graph();
        let endpoints = graph.endpoints("UserRole");
        let names: Vec<_> = endpoints.iter().map(|(e, t)| (e.side, t.name())).collect();
        assert_eq!(names, vec![(Side::First, "User"), (Side::Second, "Role")]);
        assert!(graph.endpoints("User").is_empty());
    }

    #[test]
    fn test_related_join_tables_returns_records() {
        let graph = user_role_graph();
        let related = graph.related_join_tables("User");
        assert_eq!(related.len(), 1);
        assert!(related[0].is_join_table());
        assert!(graph.related_join_tables("Missing").is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let graph = user_role_graph();
        let value = serde_json::to_value(&graph).unwrap();

        let user = &value[0];
        assert_eq!(user["name"], "User");
        assert_eq!(user["isJoinTable"], false);
        assert_eq!(user["hasRelations"], true);
        assert_eq!(user["relatedJoinTables"], serde_json::json!(["UserRole"]));
        assert!(user["firstSide"].is_null());

        let user_role = &value[2];
        assert_eq!(user_role["isJoinTable"], true);
        assert_eq!(user_role["firstSide"]["foreign"]["table"], "User");
        assert_eq!(user_role["secondSide"]["foreign"]["table"], "Role");
    }

    #[test]
    fn test_to_dot() {
        let dot = user_role_graph().to_dot();
        assert!(dot.starts_with("digraph SchemaGraph {"));
        assert!(dot.contains("label=\"UserRole\", shape=diamond"));
        assert!(dot.contains("n2 -> n0 [label=\"UserId\"]"));
        assert!(dot.contains("n2 -> n1 [label=\"RoleId\"]"));
    }
}
