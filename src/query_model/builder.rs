use log::debug;

use super::{
    clauses::{BodyClause, Clause, FromClause, TerminalClause},
    errors::QueryModelError,
    result_operators::ResultOperator,
    QueryModel,
};
use crate::expression::DataType;

/// Collects clauses one at a time and checks the arity rules on the way:
/// exactly one main from clause and exactly one terminal clause.
#[derive(Debug, Default, Clone)]
pub struct QueryModelBuilder {
    main_from_clause: Option<FromClause>,
    body_clauses: Vec<BodyClause>,
    terminal_clause: Option<TerminalClause>,
    result_operators: Vec<ResultOperator>,
}

impl QueryModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_from_clause(&self) -> Option<&FromClause> {
        self.main_from_clause.as_ref()
    }

    pub fn body_clauses(&self) -> &[BodyClause] {
        &self.body_clauses
    }

    pub fn add_clause(&mut self, clause: Clause) -> Result<(), QueryModelError> {
        match clause {
            Clause::MainFrom(from) => {
                if let Some(existing) = &self.main_from_clause {
                    return Err(QueryModelError::DuplicateMainFromClause {
                        existing: existing.item_name.clone(),
                        added: from.item_name,
                    });
                }
                self.main_from_clause = Some(from);
            }
            Clause::AdditionalFrom(from) => self.body_clauses.push(BodyClause::AdditionalFrom(from)),
            Clause::Where(where_clause) => self.body_clauses.push(BodyClause::Where(where_clause)),
            Clause::OrderBy(order_by) => self.body_clauses.push(BodyClause::OrderBy(order_by)),
            Clause::Join(join) => self.body_clauses.push(BodyClause::Join(join)),
            Clause::Select(select) => self.set_terminal_clause(TerminalClause::Select(select))?,
            Clause::Group(group) => self.set_terminal_clause(TerminalClause::Group(group))?,
        }
        Ok(())
    }

    pub fn add_result_operator(&mut self, operator: ResultOperator) {
        self.result_operators.push(operator);
    }

    fn set_terminal_clause(&mut self, clause: TerminalClause) -> Result<(), QueryModelError> {
        if self.terminal_clause.is_some() {
            return Err(QueryModelError::DuplicateTerminalClause);
        }
        self.terminal_clause = Some(clause);
        Ok(())
    }

    pub fn build(self, result_type: DataType) -> Result<QueryModel, QueryModelError> {
        let main_from_clause = self.main_from_clause.ok_or(QueryModelError::MissingMainFromClause)?;
        let terminal_clause = self.terminal_clause.ok_or(QueryModelError::MissingTerminalClause)?;
        debug!(
            "QueryModelBuilder: building model over '{}' with {} body clauses and {} result operators",
            main_from_clause.item_name,
            self.body_clauses.len(),
            self.result_operators.len()
        );
        Ok(QueryModel::new(
            main_from_clause,
            self.body_clauses,
            terminal_clause,
            self.result_operators,
            result_type,
        ))
    }
}
