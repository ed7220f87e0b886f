//! Table descriptors, from "some item type" to "this physical table under this alias".

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{SqlStatement, TableId};
use crate::expression::{DataType, Expr, SqlColumnExpr, SqlEntityExpr, SqlGroupingSelectExpr};

/// An item type not yet bound to a physical table.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnresolvedTableInfo {
    pub item_type: String,
}

/// Items of a collection member, e.g. `from o in c.Orders`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnresolvedCollectionJoinInfo {
    /// The entity owning the collection, still unresolved.
    pub source: Expr,
    pub member_name: String,
    pub item_type: String,
}

/// Elements of a grouping produced by another table of the statement.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnresolvedGroupReferenceTableInfo {
    /// Reference to the grouping item, still unresolved.
    pub referenced_group_source: Expr,
    pub item_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedSimpleTableInfo {
    pub item_type: String,
    pub table_name: String,
    pub table_alias: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedSubStatementTableInfo {
    pub table_alias: String,
    pub statement: SqlStatement,
}

/// Element rows of one group: the grouped statement without its GROUP BY,
/// filtered to the rows whose key matches the outer grouping key.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedJoinedGroupingTableInfo {
    pub table_alias: String,
    pub statement: SqlStatement,
    pub associated_grouping_select: SqlGroupingSelectExpr,
    pub grouping_source_table_alias: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum JoinCardinality {
    One,
    Many,
}

/// A navigation from an entity over a member, not yet bound to key columns.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnresolvedJoinInfo {
    pub originating_entity: SqlEntityExpr,
    pub member_name: String,
    pub cardinality: JoinCardinality,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResolvedJoinInfo {
    pub foreign_table_info: ResolvedSimpleTableInfo,
    /// Key column on the originating side.
    pub left_key: SqlColumnExpr,
    /// Key column on the foreign table.
    pub right_key: SqlColumnExpr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum JoinInfo {
    Unresolved(UnresolvedJoinInfo),
    Resolved(ResolvedJoinInfo),
}

impl JoinInfo {
    pub fn is_resolved(&self) -> bool {
        matches!(self, JoinInfo::Resolved(_))
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum TableInfo {
    Unresolved(UnresolvedTableInfo),
    UnresolvedCollectionJoin(UnresolvedCollectionJoinInfo),
    UnresolvedGroupReference(UnresolvedGroupReferenceTableInfo),
    Join(JoinInfo),
    Resolved(ResolvedSimpleTableInfo),
    SubStatement(ResolvedSubStatementTableInfo),
    JoinedGrouping(ResolvedJoinedGroupingTableInfo),
}

impl TableInfo {
    pub fn is_resolved(&self) -> bool {
        match self {
            TableInfo::Resolved(_) | TableInfo::SubStatement(_) | TableInfo::JoinedGrouping(_) => true,
            TableInfo::Join(join) => join.is_resolved(),
            TableInfo::Unresolved(_)
            | TableInfo::UnresolvedCollectionJoin(_)
            | TableInfo::UnresolvedGroupReference(_) => false,
        }
    }

    pub fn table_alias(&self) -> Option<&str> {
        match self {
            TableInfo::Resolved(info) => Some(&info.table_alias),
            TableInfo::SubStatement(info) => Some(&info.table_alias),
            TableInfo::JoinedGrouping(info) => Some(&info.table_alias),
            TableInfo::Join(JoinInfo::Resolved(join)) => Some(&join.foreign_table_info.table_alias),
            _ => None,
        }
    }

    /// The nested statement of sub-statement and joined-grouping tables.
    pub fn statement(&self) -> Option<&SqlStatement> {
        match self {
            TableInfo::SubStatement(info) => Some(&info.statement),
            TableInfo::JoinedGrouping(info) => Some(&info.statement),
            _ => None,
        }
    }

    pub fn statement_mut(&mut self) -> Option<&mut SqlStatement> {
        match self {
            TableInfo::SubStatement(info) => Some(&mut info.statement),
            TableInfo::JoinedGrouping(info) => Some(&mut info.statement),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum JoinSemantics {
    Inner,
    Left,
    CrossApply,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlJoinedTable {
    pub member_name: String,
    pub table: SqlTable,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlTable {
    pub id: TableId,
    pub table_info: TableInfo,
    pub join_semantics: JoinSemantics,
    /// Left joins hanging off this table, one per navigated member.
    pub joined_tables: Vec<SqlJoinedTable>,
}

impl SqlTable {
    pub fn new(table_info: TableInfo, join_semantics: JoinSemantics) -> Self {
        SqlTable {
            id: TableId::new(),
            table_info,
            join_semantics,
            joined_tables: Vec::new(),
        }
    }

    /// Depth-first search over this table and its joins.
    pub fn find(&self, id: TableId) -> Option<&SqlTable> {
        if self.id == id {
            return Some(self);
        }
        self.joined_tables.iter().find_map(|joined| joined.table.find(id))
    }

    pub fn joined_table(&self, member_name: &str) -> Option<&SqlTable> {
        self.joined_tables
            .iter()
            .find(|joined| joined.member_name == member_name)
            .map(|joined| &joined.table)
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableInfo::Unresolved(info) => write!(f, "TABLE({})", info.item_type),
            TableInfo::UnresolvedCollectionJoin(info) => write!(f, "TABLE-JOIN({}.{})", info.source, info.member_name),
            TableInfo::UnresolvedGroupReference(info) => write!(f, "GROUP-REF-TABLE({})", info.referenced_group_source),
            TableInfo::Join(JoinInfo::Unresolved(join)) => {
                write!(f, "JOIN({}.{})", join.originating_entity, join.member_name)
            }
            TableInfo::Join(JoinInfo::Resolved(join)) => write!(
                f,
                "[{}] [{}] ON {} = {}",
                join.foreign_table_info.table_name, join.foreign_table_info.table_alias, join.left_key, join.right_key
            ),
            TableInfo::Resolved(info) => write!(f, "[{}] [{}]", info.table_name, info.table_alias),
            TableInfo::SubStatement(info) => write!(f, "({}) [{}]", info.statement, info.table_alias),
            TableInfo::JoinedGrouping(info) => write!(f, "({}) [{}]", info.statement, info.table_alias),
        }
    }
}

impl fmt::Display for SqlTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_info)?;
        for joined in &self.joined_tables {
            write!(f, " LEFT OUTER JOIN {}", joined.table)?;
        }
        Ok(())
    }
}
