use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::expression::{DataType, Expr, Ordering};

/// Identity of a from/join clause.
///
/// Query-source references point at clauses by id. Callers may pick readable
/// ids (`"c"`, `"o"`); clones always receive fresh uuid-based ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClauseId(String);

impl ClauseId {
    pub fn new(id: impl Into<String>) -> Self {
        ClauseId(id.into())
    }

    pub fn new_unique() -> Self {
        ClauseId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClauseId {
    fn from(id: &str) -> Self {
        ClauseId::new(id)
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `from <item_name> in <from_expression>`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FromClause {
    pub id: ClauseId,
    pub item_name: String,
    pub item_type: DataType,
    pub from_expression: Expr,
}

impl FromClause {
    pub fn new(id: impl Into<ClauseId>, item_name: impl Into<String>, item_type: DataType, from_expression: Expr) -> Self {
        FromClause {
            id: id.into(),
            item_name: item_name.into(),
            item_type,
            from_expression,
        }
    }

    /// A reference expression pointing at this clause's item.
    pub fn reference(&self) -> Expr {
        Expr::query_source_reference(self.id.clone(), self.item_type.clone())
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub predicate: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OrderByClause {
    pub orderings: Vec<Ordering>,
}

/// Inner equi-join: `join <item_name> in <inner_sequence> on <outer_key> equals <inner_key>`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct JoinClause {
    pub id: ClauseId,
    pub item_name: String,
    pub item_type: DataType,
    pub inner_sequence: Expr,
    pub outer_key_selector: Expr,
    pub inner_key_selector: Expr,
}

impl JoinClause {
    pub fn reference(&self) -> Expr {
        Expr::query_source_reference(self.id.clone(), self.item_type.clone())
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectClause {
    pub selector: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GroupClause {
    pub key_selector: Expr,
    pub element_selector: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum BodyClause {
    AdditionalFrom(FromClause),
    Where(WhereClause),
    OrderBy(OrderByClause),
    Join(JoinClause),
}

impl BodyClause {
    /// Id and item name for clauses that introduce a query source.
    pub fn query_source(&self) -> Option<(&ClauseId, &str)> {
        match self {
            BodyClause::AdditionalFrom(from) => Some((&from.id, from.item_name.as_str())),
            BodyClause::Join(join) => Some((&join.id, join.item_name.as_str())),
            BodyClause::Where(_) | BodyClause::OrderBy(_) => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum TerminalClause {
    Select(SelectClause),
    Group(GroupClause),
}

/// Any clause, as handed to [`QueryModelBuilder::add_clause`](super::QueryModelBuilder::add_clause).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Clause {
    MainFrom(FromClause),
    AdditionalFrom(FromClause),
    Where(WhereClause),
    OrderBy(OrderByClause),
    Join(JoinClause),
    Select(SelectClause),
    Group(GroupClause),
}
