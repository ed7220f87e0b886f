//! Value/predicate context rewriting of resolved statements.
//!
//! SQL distinguishes predicates (usable in WHERE, ON, CASE WHEN) from values
//! (usable in SELECT, comparisons, function arguments). The query model does
//! not; this pass makes every node fit the position it occupies.

pub mod errors;
mod expression_visitor;
pub mod named_expression_combiner;
mod statement_visitor;

use log::debug;
use serde::{Deserialize, Serialize};

pub use errors::SqlContextError;

use crate::{
    expression::Expr, mapping::MappingResolutionContext, sql_statement::SqlStatement, transformed::Transformed,
};
use expression_visitor::SqlContextExpressionVisitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlExpressionContext {
    /// Any value, including multi-column values such as entities.
    ValueRequired,
    /// Exactly one column.
    SingleValueRequired,
    /// A truth value.
    PredicateRequired,
}

/// Rewrites `expr` for a position requiring `context`. Returns
/// [`Transformed::No`] with the input when nothing had to change.
pub fn apply_sql_expression_context(
    expr: Expr,
    context: SqlExpressionContext,
    mapping_context: &mut MappingResolutionContext,
) -> Result<Transformed<Expr>, SqlContextError> {
    let original = expr.clone();
    let result = SqlContextExpressionVisitor::new(mapping_context).apply(expr, context)?;
    if result == original {
        Ok(Transformed::No(original))
    } else {
        Ok(Transformed::Yes(result))
    }
}

/// Rewrites every expression of `statement`, the projection for
/// `selection_context` and the other clauses for their fixed positions.
pub fn apply_statement_context(
    statement: SqlStatement,
    selection_context: SqlExpressionContext,
    mapping_context: &mut MappingResolutionContext,
) -> Result<SqlStatement, SqlContextError> {
    debug!("SqlContext: applying {:?} to statement projection", selection_context);
    SqlContextExpressionVisitor::new(mapping_context).apply_to_statement(statement, selection_context)
}
