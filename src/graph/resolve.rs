//! Relation Resolution
//!
//! Derives many-to-many relations from classified tables. Two independent
//! passes:
//!
//! 1. Every join table gets its sides from its own foreign-key columns in
//!    declaration order (first FK column is the first side).
//! 2. Every entity table gets the join tables whose foreign keys reference it,
//!    in snapshot order, each listed once.
//!
//! Neither pass depends on the order in which the other one visits tables, so
//! the result is a pure function of the snapshot.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::classify::{ClassifiedTable, TableKind};
use super::{RelationEdge, ResolvedTable, SchemaGraph, Side};
use crate::schema::ColumnDefinition;

/// Builds a [`SchemaGraph`] from classified tables
#[derive(Debug, Default)]
pub struct RelationResolver;

impl RelationResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve relations for one snapshot
    pub fn resolve(&self, classified: Vec<ClassifiedTable>) -> SchemaGraph {
        let join_indices: Vec<usize> = classified
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind.is_join())
            .map(|(i, _)| i)
            .collect();

        let related = related_join_tables(&classified, &join_indices);

        let tables: Vec<ResolvedTable> = classified
            .into_iter()
            .zip(related)
            .map(|(c, related_join_tables)| {
                let (first_side, second_side) = match c.kind {
                    TableKind::Join => join_sides(&c.table.columns),
                    TableKind::Entity => (None, None),
                };
                ResolvedTable {
                    is_join_table: c.kind.is_join(),
                    has_relations: !related_join_tables.is_empty(),
                    related_join_tables,
                    first_side,
                    second_side,
                    table: c.table,
                }
            })
            .collect();

        debug!(
            tables = tables.len(),
            join_tables = join_indices.len(),
            "resolved relations"
        );

        build_graph(tables)
    }
}

/// First and second foreign-key columns, in declaration order
fn join_sides(columns: &[ColumnDefinition]) -> (Option<ColumnDefinition>, Option<ColumnDefinition>) {
    let mut foreign_keys = columns.iter().filter(|c| c.is_foreign_key).cloned();
    (foreign_keys.next(), foreign_keys.next())
}

/// Names of join tables referencing each table; empty for join tables
fn related_join_tables(classified: &[ClassifiedTable], join_indices: &[usize]) -> Vec<Vec<String>> {
    classified
        .iter()
        .map(|entity| {
            if entity.kind.is_join() || join_indices.is_empty() {
                return Vec::new();
            }
            join_indices
                .iter()
                .map(|&j| &classified[j].table)
                .filter(|join| {
                    join.foreign_keys()
                        .any(|fk| fk.references() == Some(entity.table.name.as_str()))
                })
                .map(|join| join.name.clone())
                .collect()
        })
        .collect()
}

/// Index tables by name and add one edge per join-table foreign key
fn build_graph(tables: Vec<ResolvedTable>) -> SchemaGraph {
    let mut graph = DiGraph::with_capacity(tables.len(), tables.len() * 2);
    let mut by_name: HashMap<String, usize> = HashMap::with_capacity(tables.len());
    let mut node_indices: Vec<NodeIndex> = Vec::with_capacity(tables.len());

    for (i, table) in tables.iter().enumerate() {
        node_indices.push(graph.add_node(table.name().to_string()));
        if by_name.contains_key(table.name()) {
            warn!(table = table.name(), "duplicate table name, keeping first for lookups");
        } else {
            by_name.insert(table.name().to_string(), i);
        }
    }

    for (i, table) in tables.iter().enumerate() {
        let sides = [
            (Side::First, table.first_side.as_ref()),
            (Side::Second, table.second_side.as_ref()),
        ];
        for (side, column) in sides {
            let Some(column) = column else { continue };
            let Some(referenced) = column.references() else {
                warn!(table = table.name(), column = %column.name, "foreign key has no target table");
                continue;
            };
            match by_name.get(referenced) {
                Some(&t) if !tables[t].is_join_table => {
                    graph.add_edge(
                        node_indices[i],
                        node_indices[t],
                        RelationEdge {
                            side,
                            column: column.name.clone(),
                        },
                    );
                }
                Some(_) => {
                    warn!(table = table.name(), referenced, "join table references another join table");
                }
                None => {
                    warn!(table = table.name(), referenced, "join table references unknown table");
                }
            }
        }
    }

    SchemaGraph {
        graph,
        tables,
        by_name,
        node_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::classify::classify_all;
    use crate::schema::TableDefinition;

    fn entity(name: &str) -> TableDefinition {
        TableDefinition::new(name, vec![ColumnDefinition::new("Id", "int").primary()])
    }

    fn join(name: &str, left: &str, right: &str) -> TableDefinition {
        TableDefinition::new(
            name,
            vec![
                ColumnDefinition::new("Id", "int").primary(),
                ColumnDefinition::foreign_key(format!("{}Id", left), "int", left, "Id"),
                ColumnDefinition::foreign_key(format!("{}Id2", right), "int", right, "Id"),
            ],
        )
    }

    fn resolve(tables: Vec<TableDefinition>) -> SchemaGraph {
        RelationResolver::new().resolve(classify_all(tables))
    }

    #[test]
    fn test_no_join_tables() {
        let graph = resolve(vec![entity("User"), entity("Role")]);
        for table in graph.tables() {
            assert!(!table.has_relations());
            assert!(table.related_join_table_names().is_empty());
            assert!(table.first_side().is_none());
        }
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_sides_follow_declaration_order() {
        // Role is listed before User, but UserRole declares User first
        let graph = resolve(vec![entity("Role"), entity("User"), join("UserRole", "User", "Role")]);
        let user_role = graph.table("UserRole").unwrap();

        assert_eq!(user_role.first_side().and_then(|c| c.references()), Some("User"));
        assert_eq!(user_role.second_side().and_then(|c| c.references()), Some("Role"));
    }

    #[test]
    fn test_self_referencing_join_listed_once() {
        let graph = resolve(vec![entity("User"), join("Friendship", "User", "User")]);
        let user = graph.table("User").unwrap();

        assert_eq!(user.related_join_table_names(), ["Friendship".to_string()]);
        assert_eq!(graph.edge_count(), 2);

        let friendship = graph.table("Friendship").unwrap();
        assert_eq!(friendship.first_side().unwrap().name, "UserId");
        assert_eq!(friendship.second_side().unwrap().name, "UserId2");
    }

    #[test]
    fn test_multiple_joins_on_same_pair() {
        let graph = resolve(vec![
            entity("User"),
            entity("Project"),
            join("ProjectOwner", "User", "Project"),
            join("ProjectMember", "Project", "User"),
        ]);

        for name in ["User", "Project"] {
            assert_eq!(
                graph.table(name).unwrap().related_join_table_names(),
                ["ProjectOwner".to_string(), "ProjectMember".to_string()]
            );
        }
    }

    #[test]
    fn test_join_tables_have_no_related_list() {
        let graph = resolve(vec![entity("A"), entity("B"), join("AB", "A", "B")]);
        let ab = graph.table("AB").unwrap();
        assert!(ab.is_join_table());
        assert!(!ab.has_relations());
        assert!(ab.related_join_table_names().is_empty());
    }

    #[test]
    fn test_unknown_target_keeps_sides() {
        let graph = resolve(vec![entity("User"), join("UserGhost", "User", "Ghost")]);
        let join = graph.table("UserGhost").unwrap();

        assert!(join.first_side().is_some());
        assert_eq!(join.second_side().and_then(|c| c.references()), Some("Ghost"));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.table("User").unwrap().has_relations());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let tables = vec![entity("User"), entity("Role"), join("UserRole", "User", "Role")];
        let first = resolve(tables.clone());
        let second = resolve(tables);
        assert_eq!(first.tables(), second.tables());
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let shadow = TableDefinition::new(
            "User",
            vec![
                ColumnDefinition::new("Id", "int").primary(),
                ColumnDefinition::new("Nickname", "string"),
            ],
        );
        let graph = resolve(vec![
            entity("User"),
            entity("Role"),
            shadow,
            join("UserRole", "User", "Role"),
        ]);

        assert_eq!(graph.tables().len(), 4);
        assert_eq!(graph.tables().iter().filter(|t| t.name() == "User").count(), 2);

        let user = graph.table("User").unwrap();
        assert_eq!(user.columns().len(), 1);
        assert_eq!(graph.counterpart("User", "UserRole").unwrap().name(), "Role");

        let widths: Vec<_> = graph
            .endpoints("UserRole")
            .iter()
            .map(|(_, table)| table.columns().len())
            .collect();
        assert_eq!(widths, vec![1, 1]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_join_referencing_join_adds_no_edge() {
        let graph = resolve(vec![
            entity("User"),
            entity("Role"),
            join("UserRole", "User", "Role"),
            join("UserRoleAudit", "UserRole", "User"),
        ]);

        let audit = graph.table("UserRoleAudit").unwrap();
        assert!(audit.is_join_table());
        assert_eq!(audit.first_side().and_then(|c| c.references()), Some("UserRole"));
        assert_eq!(audit.second_side().and_then(|c| c.references()), Some("User"));

        // UserRole -> User, UserRole -> Role, UserRoleAudit -> User
        assert_eq!(graph.edge_count(), 3);
        assert!(graph.table("UserRole").unwrap().related_join_table_names().is_empty());
        assert_eq!(
            graph.table("User").unwrap().related_join_table_names(),
            ["UserRole".to_string(), "UserRoleAudit".to_string()]
        );
    }
}
