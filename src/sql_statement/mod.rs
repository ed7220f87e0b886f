//! SQL statement model shared by preparation, mapping resolution and the
//! context rewriter.

pub mod builder;
pub mod table_info;

pub use builder::SqlStatementBuilder;
pub use table_info::{
    JoinCardinality, JoinInfo, JoinSemantics, ResolvedJoinInfo, ResolvedJoinedGroupingTableInfo,
    ResolvedSimpleTableInfo, ResolvedSubStatementTableInfo, SqlJoinedTable, SqlTable, TableInfo,
    UnresolvedCollectionJoinInfo, UnresolvedGroupReferenceTableInfo, UnresolvedJoinInfo, UnresolvedTableInfo,
};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::expression::{DataType, Expr, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId(Uuid);

impl TableId {
    pub fn new() -> Self {
        TableId(Uuid::new_v4())
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlStatement {
    /// `Sequence(row)` for row-returning statements, the scalar type after
    /// an aggregation, `Boolean` for `Any`.
    pub data_type: DataType,
    pub select_projection: Expr,
    pub sql_tables: Vec<SqlTable>,
    pub where_condition: Option<Expr>,
    pub group_by_expression: Option<Expr>,
    pub orderings: Vec<Ordering>,
    pub top_expression: Option<Expr>,
    pub is_distinct_query: bool,
    /// Row number column when the statement pages over a sub-statement.
    pub row_number_selector: Option<Expr>,
    pub current_row_number_offset: Option<Expr>,
}

impl SqlStatement {
    /// Finds a table of this statement (joins included) by id. Nested
    /// statements are not searched.
    pub fn find_table(&self, id: TableId) -> Option<&SqlTable> {
        self.sql_tables.iter().find_map(|table| table.find(id))
    }

    /// Number of tables including joins, not counting nested statements.
    pub fn table_count(&self) -> usize {
        fn count(table: &SqlTable) -> usize {
            1 + table.joined_tables.iter().map(|j| count(&j.table)).sum::<usize>()
        }
        self.sql_tables.iter().map(count).sum()
    }

    /// Every expression directly held by the statement, in clause order.
    pub fn expressions(&self) -> Vec<&Expr> {
        let mut expressions = vec![&self.select_projection];
        expressions.extend(self.where_condition.iter());
        expressions.extend(self.group_by_expression.iter());
        expressions.extend(self.orderings.iter().map(|o| &o.expression));
        expressions.extend(self.top_expression.iter());
        expressions.extend(self.row_number_selector.iter());
        expressions.extend(self.current_row_number_offset.iter());
        expressions
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.is_distinct_query {
            write!(f, "DISTINCT ")?;
        }
        if let Some(top) = &self.top_expression {
            write!(f, "TOP ({}) ", top)?;
        }
        write!(f, "{}", self.select_projection)?;
        for (i, table) in self.sql_tables.iter().enumerate() {
            match (i, table.join_semantics) {
                (0, _) => write!(f, " FROM {}", table)?,
                (_, JoinSemantics::CrossApply) => write!(f, " CROSS APPLY {}", table)?,
                _ => write!(f, " CROSS JOIN {}", table)?,
            }
        }
        if let Some(condition) = &self.where_condition {
            write!(f, " WHERE {}", condition)?;
        }
        if let Some(group_by) = &self.group_by_expression {
            write!(f, " GROUP BY {}", group_by)?;
        }
        if !self.orderings.is_empty() {
            let orderings: Vec<String> = self.orderings.iter().map(|o| o.to_string()).collect();
            write!(f, " ORDER BY {}", orderings.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{SqlColumnExpr, SqlEntityExpr};

    fn simple_table(name: &str, alias: &str) -> SqlTable {
        SqlTable::new(
            TableInfo::Resolved(ResolvedSimpleTableInfo {
                item_type: name.to_string(),
                table_name: format!("{}Table", name),
                table_alias: alias.to_string(),
            }),
            JoinSemantics::Inner,
        )
    }

    #[test]
    fn test_find_table_searches_joins() {
        let mut customer = simple_table("Customer", "t0");
        let pk = SqlColumnExpr::new("t0", "ID", DataType::Int32, true);
        let entity = SqlEntityExpr::new("Customer", "t0", None, pk.clone(), vec![pk]);
        let join = SqlTable::new(
            TableInfo::Join(JoinInfo::Unresolved(UnresolvedJoinInfo {
                originating_entity: entity,
                member_name: "Address".to_string(),
                cardinality: JoinCardinality::One,
            })),
            JoinSemantics::Left,
        );
        let join_id = join.id;
        customer.joined_tables.push(SqlJoinedTable {
            member_name: "Address".to_string(),
            table: join,
        });

        let statement = SqlStatementBuilder::new()
            .with_projection(Expr::bool_constant(true))
            .with_table(customer)
            .build();

        assert!(statement.find_table(join_id).is_some());
        assert_eq!(statement.table_count(), 2);
    }

    #[test]
    fn test_display() {
        let statement = SqlStatementBuilder::new()
            .with_projection(Expr::column(SqlColumnExpr::new("t0", "Name", DataType::String, false)))
            .with_table(simple_table("Customer", "t0"))
            .build();
        assert_eq!(statement.to_string(), "SELECT [t0].[Name] FROM [CustomerTable] [t0]");
    }
}
