use std::collections::HashMap;

use log::trace;

use super::{
    clauses::{BodyClause, ClauseId, FromClause, JoinClause},
    QueryModel,
};
use crate::expression::{Expr, SubQueryExpr};

/// Replacement table for query-source references, keyed by the referenced clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySourceMapping {
    replacements: HashMap<ClauseId, Expr>,
}

impl QuerySourceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mapping(&mut self, clause: ClauseId, replacement: Expr) {
        self.replacements.insert(clause, replacement);
    }

    pub fn get_expression(&self, clause: &ClauseId) -> Option<&Expr> {
        self.replacements.get(clause)
    }

    pub fn contains_mapping(&self, clause: &ClauseId) -> bool {
        self.replacements.contains_key(clause)
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

/// Rewrites every query-source reference found in `mapping`; unmapped
/// references stay as they are. Nested sub-queries are cloned with the same
/// mapping.
pub fn replace_clause_references(expr: Expr, mapping: &mut QuerySourceMapping) -> Expr {
    expr.transform_up(&mut |node| match node {
        Expr::QuerySourceReference(reference) => match mapping.get_expression(&reference.clause) {
            Some(replacement) => replacement.clone(),
            None => Expr::QuerySourceReference(reference),
        },
        Expr::SubQuery(sub_query) => Expr::SubQuery(SubQueryExpr {
            query_model: Box::new(sub_query.query_model.clone_with_mapping(mapping)),
        }),
        other => other,
    })
}

impl QueryModel {
    /// Deep copy with fresh clause ids.
    ///
    /// References to clauses of this model follow the clones; references to
    /// clauses outside the model are rewritten through `mapping`. On return
    /// `mapping` also holds the old → new entries for this model's clauses.
    pub fn clone_with_mapping(&self, mapping: &mut QuerySourceMapping) -> QueryModel {
        let main_from_clause = clone_from_clause(&self.main_from_clause, mapping);
        let body_clauses: Vec<BodyClause> = self
            .body_clauses
            .iter()
            .map(|clause| match clause {
                BodyClause::AdditionalFrom(from) => BodyClause::AdditionalFrom(clone_from_clause(from, mapping)),
                BodyClause::Join(join) => BodyClause::Join(clone_join_clause(join, mapping)),
                other => other.clone(),
            })
            .collect();

        let mut cloned = QueryModel::new(
            main_from_clause,
            body_clauses,
            self.terminal_clause.clone(),
            self.result_operators.clone(),
            self.result_type.clone(),
        );
        cloned.identifier_generator = self.identifier_generator.clone();
        cloned.transform_expressions(&mut |expr| replace_clause_references(expr, mapping));

        trace!(
            "QueryModel::clone_with_mapping: cloned model over '{}' ({} mapped clauses)",
            cloned.main_from_clause.item_name,
            mapping.len()
        );
        cloned
    }

    /// Deep copy with fresh clause ids and an empty caller mapping.
    pub fn clone_fresh(&self) -> QueryModel {
        self.clone_with_mapping(&mut QuerySourceMapping::new())
    }
}

fn clone_from_clause(from: &FromClause, mapping: &mut QuerySourceMapping) -> FromClause {
    let cloned = FromClause {
        id: ClauseId::new_unique(),
        ..from.clone()
    };
    mapping.add_mapping(from.id.clone(), cloned.reference());
    cloned
}

fn clone_join_clause(join: &JoinClause, mapping: &mut QuerySourceMapping) -> JoinClause {
    let cloned = JoinClause {
        id: ClauseId::new_unique(),
        ..join.clone()
    };
    mapping.add_mapping(join.id.clone(), cloned.reference());
    cloned
}
