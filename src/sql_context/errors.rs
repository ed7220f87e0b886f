use thiserror::Error;

use crate::sql_statement::TableInfo;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlContextError {
    #[error("UnsupportedConstructError: {kind} has no SQL representation ('{expression}')")]
    UnsupportedConstruct { kind: String, expression: String },

    #[error("UnsupportedConstructError: '{0}' produces several values where a single value is required")]
    MultipleValuesInSingleValuePosition(String),

    #[error("SqlContextError: '{expression}' of type {data_type} cannot be used as a predicate")]
    NonBooleanInPredicate { expression: String, data_type: String },
}

impl SqlContextError {
    pub(super) fn unsupported(expr: &crate::expression::Expr) -> Self {
        SqlContextError::UnsupportedConstruct {
            kind: expr.kind_name().to_string(),
            expression: expr.to_string(),
        }
    }

    pub(super) fn unresolved_table(table_info: &TableInfo) -> Self {
        let kind = match table_info {
            TableInfo::Unresolved(_) => "UnresolvedTable",
            TableInfo::UnresolvedCollectionJoin(_) => "UnresolvedCollectionJoin",
            TableInfo::UnresolvedGroupReference(_) => "UnresolvedGroupReference",
            TableInfo::Join(_) => "UnresolvedJoin",
            _ => "Table",
        };
        SqlContextError::UnsupportedConstruct {
            kind: kind.to_string(),
            expression: table_info.to_string(),
        }
    }
}
