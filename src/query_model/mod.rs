//! Query model.
//!
//! A [`QueryModel`] is the editable, clause-based form of one parsed query:
//!
//! ```text
//! from c in Customers          <- main from clause
//! from o in c.Orders           <- body clauses (additional from, where,
//! where o.Total > 100             order by, join), in evaluation order
//! select new { c.Name, o.ID }  <- terminal clause (select or group)
//! .Take(10)                    <- result operators
//! ```
//!
//! Clauses that introduce an item carry a [`ClauseId`]; expressions refer to
//! those items through `Expr::QuerySourceReference`. Models are built with
//! [`QueryModelBuilder`], which enforces the clause arity rules.

pub mod builder;
pub mod clauses;
pub mod cloning;
pub mod errors;
pub mod result_operators;

pub use builder::QueryModelBuilder;
pub use clauses::{
    BodyClause, Clause, ClauseId, FromClause, GroupClause, JoinClause, OrderByClause, SelectClause, TerminalClause,
    WhereClause,
};
pub use cloning::QuerySourceMapping;
pub use errors::QueryModelError;
pub use result_operators::ResultOperator;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    expression::{DataType, Expr, Ordering},
    utils::unique_identifier::UniqueIdentifierGenerator,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub main_from_clause: FromClause,
    pub body_clauses: Vec<BodyClause>,
    pub terminal_clause: TerminalClause,
    pub result_operators: Vec<ResultOperator>,
    pub result_type: DataType,
    /// Item names already taken by from-clauses of this model.
    #[serde(default)]
    identifier_generator: UniqueIdentifierGenerator,
}

impl QueryModel {
    pub(crate) fn new(
        main_from_clause: FromClause,
        body_clauses: Vec<BodyClause>,
        terminal_clause: TerminalClause,
        result_operators: Vec<ResultOperator>,
        result_type: DataType,
    ) -> Self {
        let mut identifier_generator = UniqueIdentifierGenerator::new();
        identifier_generator.add_known_identifier(&main_from_clause.item_name);
        for clause in &body_clauses {
            if let Some((_, item_name)) = clause.query_source() {
                identifier_generator.add_known_identifier(item_name);
            }
        }
        QueryModel {
            main_from_clause,
            body_clauses,
            terminal_clause,
            result_operators,
            result_type,
            identifier_generator,
        }
    }

    /// Appends a body clause. Clauses introducing a new item register its
    /// name so that [`get_new_name`](Self::get_new_name) never hands it out.
    pub fn add_body_clause(&mut self, clause: BodyClause) {
        if let Some((_, item_name)) = clause.query_source() {
            self.identifier_generator.add_known_identifier(item_name);
        }
        self.body_clauses.push(clause);
    }

    /// Returns an item name starting with `prefix` that no from-clause uses yet.
    pub fn get_new_name(&mut self, prefix: &str) -> String {
        let name = self.identifier_generator.get_unique_identifier(prefix);
        self.identifier_generator.add_known_identifier(&name);
        name
    }

    pub fn is_known_item_name(&self, name: &str) -> bool {
        self.identifier_generator.is_known_identifier(name)
    }

    /// Tracker of the item names in use; seeds alias generation for a run.
    pub fn identifier_generator(&self) -> &UniqueIdentifierGenerator {
        &self.identifier_generator
    }

    /// Applies `f` to every expression of every clause and result operator,
    /// in clause order. Each top-level expression is passed exactly once.
    pub fn transform_expressions(&mut self, f: &mut dyn FnMut(Expr) -> Expr) {
        fn apply(slot: &mut Expr, f: &mut dyn FnMut(Expr) -> Expr) {
            let taken = std::mem::replace(slot, Expr::bool_constant(false));
            *slot = f(taken);
        }
        fn apply_orderings(orderings: &mut [Ordering], f: &mut dyn FnMut(Expr) -> Expr) {
            for ordering in orderings {
                apply(&mut ordering.expression, f);
            }
        }

        apply(&mut self.main_from_clause.from_expression, f);
        for clause in &mut self.body_clauses {
            match clause {
                BodyClause::AdditionalFrom(from) => apply(&mut from.from_expression, f),
                BodyClause::Where(where_clause) => apply(&mut where_clause.predicate, f),
                BodyClause::OrderBy(order_by) => apply_orderings(&mut order_by.orderings, f),
                BodyClause::Join(join) => {
                    apply(&mut join.inner_sequence, f);
                    apply(&mut join.outer_key_selector, f);
                    apply(&mut join.inner_key_selector, f);
                }
            }
        }
        match &mut self.terminal_clause {
            TerminalClause::Select(select) => apply(&mut select.selector, f),
            TerminalClause::Group(group) => {
                apply(&mut group.key_selector, f);
                apply(&mut group.element_selector, f);
            }
        }
        for operator in &mut self.result_operators {
            operator.transform_expressions(f);
        }
    }
}

impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = &self.main_from_clause;
        write!(f, "from {} in {}", from.item_name, from.from_expression)?;
        for clause in &self.body_clauses {
            match clause {
                BodyClause::AdditionalFrom(from) => write!(f, " from {} in {}", from.item_name, from.from_expression)?,
                BodyClause::Where(w) => write!(f, " where {}", w.predicate)?,
                BodyClause::OrderBy(o) => {
                    let orderings: Vec<String> = o.orderings.iter().map(|o| o.to_string()).collect();
                    write!(f, " orderby {}", orderings.join(", "))?
                }
                BodyClause::Join(j) => write!(
                    f,
                    " join {} in {} on {} equals {}",
                    j.item_name, j.inner_sequence, j.outer_key_selector, j.inner_key_selector
                )?,
            }
        }
        match &self.terminal_clause {
            TerminalClause::Select(s) => write!(f, " select {}", s.selector)?,
            TerminalClause::Group(g) => write!(f, " group {} by {}", g.element_selector, g.key_selector)?,
        }
        for operator in &self.result_operators {
            write!(f, " => {}", operator)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ConstantExpr, QueryableExpr};

    fn customers_from(id: &str, item_name: &str) -> FromClause {
        FromClause::new(
            id,
            item_name,
            DataType::Entity("Customer".to_string()),
            Expr::Queryable(QueryableExpr {
                item_type: "Customer".to_string(),
            }),
        )
    }

    fn simple_model() -> QueryModel {
        let from = customers_from("c", "c");
        let selector = from.reference();
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(from)).unwrap();
        builder
            .add_clause(Clause::Select(SelectClause { selector }))
            .unwrap();
        builder
            .build(DataType::sequence(DataType::Entity("Customer".to_string())))
            .unwrap()
    }

    #[test]
    fn test_get_new_name_skips_item_names() {
        let mut model = simple_model();
        model.add_body_clause(BodyClause::AdditionalFrom(customers_from("c0", "c0")));

        let name = model.get_new_name("c");
        assert_ne!(name, "c0");
        assert!(name.starts_with('c'));
        assert!(model.is_known_item_name(&name));
    }

    #[test]
    fn test_transform_expressions_visits_each_expression_once() {
        let mut model = simple_model();
        model.add_body_clause(BodyClause::Where(WhereClause {
            predicate: Expr::bool_constant(true),
        }));
        model.result_operators.push(ResultOperator::Take {
            count: Expr::Constant(ConstantExpr::int(5)),
        });

        let mut visited = 0;
        model.transform_expressions(&mut |e| {
            visited += 1;
            e
        });
        // from expression, where predicate, selector, take count
        assert_eq!(visited, 4);
    }

    #[test]
    fn test_display() {
        let model = simple_model();
        assert_eq!(model.to_string(), "from c in Queryable<Customer> select [c]");
    }
}
