//! Query model → unresolved SQL statement.
//!
//! Every from/join clause becomes a [`SqlTable`] whose table info is still
//! unresolved (an item type, a collection member, a group reference) or a
//! nested statement. References to clause items become
//! `SqlTableReference` expressions, nested query models become
//! `SqlSubStatement` expressions. Nothing here knows about physical tables;
//! that is the mapping resolution stage's job.

mod errors;
mod result_operators;

pub use errors::PreparationError;

use std::collections::HashMap;

use log::debug;

use crate::{
    expression::{
        DataType, Expr, NamedExpr, Ordering, SqlGroupingSelectExpr, SqlTableReferenceExpr,
    },
    query_model::{BodyClause, ClauseId, FromClause, JoinClause, QueryModel, TerminalClause},
    sql_statement::{
        JoinSemantics, ResolvedSubStatementTableInfo, SqlStatement, SqlStatementBuilder, SqlTable, TableInfo,
        UnresolvedCollectionJoinInfo, UnresolvedGroupReferenceTableInfo, UnresolvedTableInfo,
    },
    utils::unique_identifier::UniqueIdentifierGenerator,
};

/// Prepares `model` into an unresolved statement. Sub-statement aliases
/// (`q0`, `q1`, ...) are drawn from `generator`.
pub fn prepare_query_model(
    model: &QueryModel,
    generator: &mut UniqueIdentifierGenerator,
) -> Result<SqlStatement, PreparationError> {
    let mut mapping = HashMap::new();
    let statement = SqlPreparationQueryModelVisitor::new(&mut mapping, generator).visit_query_model(model)?;
    debug!("prepare_query_model: {}", statement);
    Ok(statement)
}

/// Gives the projection of a statement that becomes a sub-statement the
/// column names outer references resolve against.
pub(crate) fn name_sub_statement_projection(projection: Expr) -> Expr {
    match projection {
        Expr::New(new) => Expr::New(NamedExpr::create_new_expression_with_names(new)),
        Expr::SqlGroupingSelect(grouping) => {
            let key_expression = match *grouping.key_expression {
                Expr::New(new) => Expr::New(NamedExpr::create_new_expression_with_names(new)),
                key @ Expr::Named(_) => key,
                key if key.data_type().is_entity() => key,
                key => NamedExpr::wrap(Some("key".to_string()), key),
            };
            Expr::SqlGroupingSelect(SqlGroupingSelectExpr {
                key_expression: Box::new(key_expression),
                ..grouping
            })
        }
        named @ Expr::Named(_) => named,
        entity if entity.data_type().is_entity() => entity,
        other => NamedExpr::wrap(None, other),
    }
}

pub(crate) struct SqlPreparationQueryModelVisitor<'a> {
    builder: SqlStatementBuilder,
    /// Clause id → prepared reference, shared with nested query models so
    /// inner references to outer items resolve.
    mapping: &'a mut HashMap<ClauseId, Expr>,
    generator: &'a mut UniqueIdentifierGenerator,
}

impl<'a> SqlPreparationQueryModelVisitor<'a> {
    pub(crate) fn new(
        mapping: &'a mut HashMap<ClauseId, Expr>,
        generator: &'a mut UniqueIdentifierGenerator,
    ) -> Self {
        SqlPreparationQueryModelVisitor {
            builder: SqlStatementBuilder::new(),
            mapping,
            generator,
        }
    }

    pub(crate) fn visit_query_model(mut self, model: &QueryModel) -> Result<SqlStatement, PreparationError> {
        self.add_from_clause(&model.main_from_clause)?;

        for clause in &model.body_clauses {
            match clause {
                BodyClause::AdditionalFrom(from) => self.add_from_clause(from)?,
                BodyClause::Where(where_clause) => {
                    let predicate = self.prepare_expression(where_clause.predicate.clone())?;
                    self.builder.add_where_condition(predicate);
                }
                BodyClause::OrderBy(order_by) => {
                    let mut orderings = Vec::with_capacity(order_by.orderings.len());
                    for ordering in &order_by.orderings {
                        orderings.push(Ordering {
                            expression: self.prepare_expression(ordering.expression.clone())?,
                            direction: ordering.direction,
                        });
                    }
                    // later order-by clauses take precedence
                    orderings.append(&mut self.builder.orderings);
                    self.builder.orderings = orderings;
                }
                BodyClause::Join(join) => self.add_join_clause(join)?,
            }
        }

        match &model.terminal_clause {
            TerminalClause::Select(select) => {
                let projection = self.prepare_expression(select.selector.clone())?;
                self.builder.data_type = Some(DataType::sequence(projection.data_type()));
                self.builder.select_projection = Some(projection);
            }
            TerminalClause::Group(group) => {
                let key = self.prepare_expression(group.key_selector.clone())?;
                let element = self.prepare_expression(group.element_selector.clone())?;
                let grouping = SqlGroupingSelectExpr::new(key.clone(), element, Vec::new());
                self.builder.data_type = Some(DataType::sequence(grouping.data_type()));
                self.builder.select_projection = Some(Expr::SqlGroupingSelect(grouping));
                self.builder.group_by_expression = Some(key);
            }
        }

        for operator in &model.result_operators {
            self.handle_result_operator(operator)?;
        }

        Ok(self.builder.build())
    }

    fn add_from_clause(&mut self, from: &FromClause) -> Result<(), PreparationError> {
        let table = self.prepare_from_expression(&from.from_expression, &from.item_type)?;
        self.register_table(from.id.clone(), from.item_type.clone(), table);
        Ok(())
    }

    fn add_join_clause(&mut self, join: &JoinClause) -> Result<(), PreparationError> {
        let table = self.prepare_from_expression(&join.inner_sequence, &join.item_type)?;
        self.register_table(join.id.clone(), join.item_type.clone(), table);
        let outer_key = self.prepare_expression(join.outer_key_selector.clone())?;
        let inner_key = self.prepare_expression(join.inner_key_selector.clone())?;
        self.builder.add_where_condition(Expr::equal(outer_key, inner_key));
        Ok(())
    }

    fn register_table(&mut self, clause: ClauseId, item_type: DataType, table: SqlTable) {
        let reference = Expr::SqlTableReference(SqlTableReferenceExpr {
            table: table.id,
            data_type: item_type,
        });
        self.mapping.insert(clause, reference);
        self.builder.sql_tables.push(table);
    }

    fn prepare_from_expression(&mut self, from_expression: &Expr, item_type: &DataType) -> Result<SqlTable, PreparationError> {
        match from_expression {
            Expr::Queryable(queryable) => Ok(SqlTable::new(
                TableInfo::Unresolved(UnresolvedTableInfo {
                    item_type: queryable.item_type.clone(),
                }),
                JoinSemantics::Inner,
            )),
            Expr::SubQuery(sub_query) => {
                let mut statement = self.prepare_nested_query_model(&sub_query.query_model)?;
                statement.select_projection = name_sub_statement_projection(statement.select_projection);
                Ok(SqlTable::new(
                    TableInfo::SubStatement(ResolvedSubStatementTableInfo {
                        table_alias: self.generator.get_unique_identifier("q"),
                        statement,
                    }),
                    JoinSemantics::Inner,
                ))
            }
            Expr::Member(member) => {
                let source = self.prepare_expression((*member.expression).clone())?;
                Ok(SqlTable::new(
                    TableInfo::UnresolvedCollectionJoin(UnresolvedCollectionJoinInfo {
                        source,
                        member_name: member.member_name.clone(),
                        item_type: entity_name(item_type)?,
                    }),
                    JoinSemantics::Inner,
                ))
            }
            Expr::QuerySourceReference(reference) if matches!(reference.data_type, DataType::Grouping { .. }) => {
                let source = self.prepare_expression(from_expression.clone())?;
                Ok(SqlTable::new(
                    TableInfo::UnresolvedGroupReference(UnresolvedGroupReferenceTableInfo {
                        referenced_group_source: source,
                        item_type: item_type.clone(),
                    }),
                    JoinSemantics::CrossApply,
                ))
            }
            other => Err(PreparationError::UnsupportedFromExpression(other.to_string())),
        }
    }

    fn prepare_nested_query_model(&mut self, model: &QueryModel) -> Result<SqlStatement, PreparationError> {
        SqlPreparationQueryModelVisitor::new(&mut *self.mapping, &mut *self.generator).visit_query_model(model)
    }

    /// Replaces clause references and nested query models.
    pub(crate) fn prepare_expression(&mut self, expr: Expr) -> Result<Expr, PreparationError> {
        match expr {
            Expr::QuerySourceReference(reference) => self
                .mapping
                .get(&reference.clause)
                .cloned()
                .ok_or_else(|| PreparationError::UnmappedQuerySource(reference.clause.to_string())),
            Expr::SubQuery(sub_query) => {
                let statement = self.prepare_nested_query_model(&sub_query.query_model)?;
                Ok(Expr::sub_statement(statement))
            }
            other => other.try_map_children(&mut |child| self.prepare_expression(child)),
        }
    }

    fn current_data_type(&self) -> DataType {
        match (&self.builder.data_type, &self.builder.select_projection) {
            (Some(data_type), _) => data_type.clone(),
            (None, Some(projection)) => DataType::sequence(projection.data_type()),
            (None, None) => DataType::sequence(DataType::Boolean),
        }
    }
}

fn entity_name(item_type: &DataType) -> Result<String, PreparationError> {
    match item_type.underlying() {
        DataType::Entity(name) => Ok(name.clone()),
        other => Err(PreparationError::NonEntityItemType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expression::{BinaryOperator, ConstantExpr, OrderingDirection, QueryableExpr, SubQueryExpr},
        query_model::{Clause, OrderByClause, QueryModelBuilder, SelectClause, WhereClause},
    };

    fn entity(name: &str) -> DataType {
        DataType::Entity(name.to_string())
    }

    fn from(id: &str, item_type: &str) -> FromClause {
        FromClause::new(
            id,
            id,
            entity(item_type),
            Expr::Queryable(QueryableExpr {
                item_type: item_type.to_string(),
            }),
        )
    }

    fn model(clauses: Vec<Clause>, result_type: DataType) -> QueryModel {
        let mut builder = QueryModelBuilder::new();
        for clause in clauses {
            builder.add_clause(clause).unwrap();
        }
        builder.build(result_type).unwrap()
    }

    #[test]
    fn test_simple_from_select() {
        let c = from("c", "Customer");
        let query = model(
            vec![
                Clause::MainFrom(c.clone()),
                Clause::Select(SelectClause { selector: c.reference() }),
            ],
            DataType::sequence(entity("Customer")),
        );
        let statement = prepare_query_model(&query, &mut UniqueIdentifierGenerator::new()).unwrap();

        assert_eq!(statement.sql_tables.len(), 1);
        assert!(matches!(
            &statement.sql_tables[0].table_info,
            TableInfo::Unresolved(info) if info.item_type == "Customer"
        ));
        assert!(matches!(
            &statement.select_projection,
            Expr::SqlTableReference(r) if r.table == statement.sql_tables[0].id
        ));
        assert_eq!(statement.data_type, DataType::sequence(entity("Customer")));
    }

    #[test]
    fn test_where_clauses_are_combined_and_orderings_prepend() {
        let c = from("c", "Customer");
        let name = Expr::member(c.reference(), "Name", DataType::String);
        let city = Expr::member(c.reference(), "City", DataType::String);
        let query = model(
            vec![
                Clause::MainFrom(c.clone()),
                Clause::Where(WhereClause {
                    predicate: Expr::equal(name.clone(), Expr::Constant(ConstantExpr::string("a"))),
                }),
                Clause::Where(WhereClause {
                    predicate: Expr::equal(city.clone(), Expr::Constant(ConstantExpr::string("b"))),
                }),
                Clause::OrderBy(OrderByClause {
                    orderings: vec![Ordering {
                        expression: name,
                        direction: OrderingDirection::Asc,
                    }],
                }),
                Clause::OrderBy(OrderByClause {
                    orderings: vec![Ordering {
                        expression: city,
                        direction: OrderingDirection::Desc,
                    }],
                }),
                Clause::Select(SelectClause { selector: c.reference() }),
            ],
            DataType::sequence(entity("Customer")),
        );
        let statement = prepare_query_model(&query, &mut UniqueIdentifierGenerator::new()).unwrap();

        assert!(matches!(
            statement.where_condition,
            Some(Expr::Binary(ref b)) if b.operator == BinaryOperator::AndAlso
        ));
        assert_eq!(statement.orderings.len(), 2);
        assert_eq!(statement.orderings[0].direction, OrderingDirection::Desc);
    }

    #[test]
    fn test_collection_from_becomes_collection_join() {
        let c = from("c", "Customer");
        let o = FromClause::new(
            "o",
            "o",
            entity("Order"),
            Expr::member(c.reference(), "Orders", DataType::sequence(entity("Order"))),
        );
        let query = model(
            vec![
                Clause::MainFrom(c),
                Clause::AdditionalFrom(o.clone()),
                Clause::Select(SelectClause { selector: o.reference() }),
            ],
            DataType::sequence(entity("Order")),
        );
        let statement = prepare_query_model(&query, &mut UniqueIdentifierGenerator::new()).unwrap();

        assert_eq!(statement.sql_tables.len(), 2);
        let TableInfo::UnresolvedCollectionJoin(join) = &statement.sql_tables[1].table_info else {
            panic!("expected collection join");
        };
        assert_eq!(join.member_name, "Orders");
        assert_eq!(join.item_type, "Order");
        assert!(matches!(&join.source, Expr::SqlTableReference(r) if r.table == statement.sql_tables[0].id));
    }

    #[test]
    fn test_sub_query_from_gets_alias_and_named_projection() {
        let inner_c = from("ic", "Customer");
        let inner = model(
            vec![
                Clause::MainFrom(inner_c.clone()),
                Clause::Select(SelectClause {
                    selector: Expr::member(inner_c.reference(), "Name", DataType::String),
                }),
            ],
            DataType::sequence(DataType::String),
        );
        let outer_from = FromClause::new(
            "n",
            "n",
            DataType::String,
            Expr::SubQuery(SubQueryExpr {
                query_model: Box::new(inner),
            }),
        );
        let query = model(
            vec![
                Clause::MainFrom(outer_from.clone()),
                Clause::Select(SelectClause {
                    selector: outer_from.reference(),
                }),
            ],
            DataType::sequence(DataType::String),
        );
        let statement = prepare_query_model(&query, &mut UniqueIdentifierGenerator::new()).unwrap();

        let TableInfo::SubStatement(info) = &statement.sql_tables[0].table_info else {
            panic!("expected sub-statement table");
        };
        assert_eq!(info.table_alias, "q0");
        assert!(matches!(&info.statement.select_projection, Expr::Named(n) if n.name.is_none()));
    }

    #[test]
    fn test_unknown_reference_fails() {
        let c = from("c", "Customer");
        let stranger = from("x", "Customer");
        let query = model(
            vec![
                Clause::MainFrom(c),
                Clause::Select(SelectClause {
                    selector: stranger.reference(),
                }),
            ],
            DataType::sequence(entity("Customer")),
        );
        let err = prepare_query_model(&query, &mut UniqueIdentifierGenerator::new()).unwrap_err();
        assert_eq!(err, PreparationError::UnmappedQuerySource("x".to_string()));
    }
}
