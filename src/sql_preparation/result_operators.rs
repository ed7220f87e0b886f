use log::trace;

use super::{name_sub_statement_projection, PreparationError, SqlPreparationQueryModelVisitor};
use crate::{
    expression::{
        AggregationFunction, BinaryOperator, DataType, Expr, NewExpr, Ordering, OrderingDirection, SqlExistsExpr,
        SqlLiteralExpr, SqlRowNumberExpr, SqlTableReferenceExpr,
    },
    query_model::ResultOperator,
    sql_statement::{JoinSemantics, ResolvedSubStatementTableInfo, SqlStatementBuilder, SqlTable, TableInfo},
};

impl SqlPreparationQueryModelVisitor<'_> {
    pub(super) fn handle_result_operator(&mut self, operator: &ResultOperator) -> Result<(), PreparationError> {
        trace!("SqlPreparation: applying result operator {}", operator);
        let input_type = self.current_data_type();

        match operator {
            ResultOperator::Count
            | ResultOperator::Sum
            | ResultOperator::Min
            | ResultOperator::Max
            | ResultOperator::Average => {
                if self.builder.top_expression.is_some() || self.builder.is_distinct_query {
                    self.move_current_statement_to_sub_statement();
                }
                let function = match operator {
                    ResultOperator::Count => AggregationFunction::Count,
                    ResultOperator::Sum => AggregationFunction::Sum,
                    ResultOperator::Min => AggregationFunction::Min,
                    ResultOperator::Max => AggregationFunction::Max,
                    _ => AggregationFunction::Average,
                };
                let projection = self.take_projection(operator)?;
                let result_type = operator.output_type(&self.current_data_type());
                self.builder.select_projection = Some(Expr::aggregation(function, projection, result_type.clone()));
                self.builder.data_type = Some(result_type);
            }
            ResultOperator::Distinct => {
                if self.builder.top_expression.is_some() {
                    self.move_current_statement_to_sub_statement();
                }
                self.builder.is_distinct_query = true;
            }
            ResultOperator::Take { count } => {
                let count = self.prepare_expression(count.clone())?;
                self.apply_take(count);
            }
            ResultOperator::Skip { count } => {
                let count = self.prepare_expression(count.clone())?;
                self.apply_skip(operator, count)?;
            }
            ResultOperator::First { .. } => {
                self.apply_take(SqlLiteralExpr::int(1));
                self.builder.data_type = Some(operator.output_type(&input_type));
            }
            ResultOperator::Single { .. } => {
                // two rows are enough to detect a second match
                self.apply_take(SqlLiteralExpr::int(2));
                self.builder.data_type = Some(operator.output_type(&input_type));
            }
            ResultOperator::Any => {
                let statement = self.builder.get_statement_and_reset();
                self.builder.select_projection = Some(Expr::SqlExists(SqlExistsExpr {
                    expression: Box::new(Expr::sub_statement(statement)),
                }));
                self.builder.data_type = Some(DataType::Boolean);
            }
        }
        Ok(())
    }

    fn take_projection(&mut self, operator: &ResultOperator) -> Result<Expr, PreparationError> {
        self.builder
            .select_projection
            .take()
            .ok_or_else(|| PreparationError::UnsupportedResultOperator {
                operator: operator.to_string(),
                input: "statement without projection".to_string(),
            })
    }

    /// TOP n, or a row-number window when the statement already pages.
    fn apply_take(&mut self, count: Expr) {
        match (&self.builder.row_number_selector, &self.builder.current_row_number_offset) {
            (Some(row_number), Some(offset)) => {
                let upper_bound = Expr::binary(BinaryOperator::Add, offset.clone(), count);
                let condition = Expr::binary(BinaryOperator::LessThanOrEqual, row_number.clone(), upper_bound);
                self.builder.add_where_condition(condition);
            }
            _ => {
                if self.builder.top_expression.is_some() {
                    self.move_current_statement_to_sub_statement();
                }
                self.builder.top_expression = Some(count);
            }
        }
    }

    /// Moves the statement into a sub-statement projecting
    /// `new KeyValuePair(Key = projection, Value = ROW_NUMBER())` and selects
    /// the rows whose row number is above `count`.
    fn apply_skip(&mut self, operator: &ResultOperator, count: Expr) -> Result<(), PreparationError> {
        let original_type = self.current_data_type();
        let projection = self.take_projection(operator)?;
        let projection_type = projection.data_type();

        let mut orderings = std::mem::take(&mut self.builder.orderings);
        if orderings.is_empty() {
            let constant_statement = SqlStatementBuilder::new()
                .with_projection(SqlLiteralExpr::int(1))
                .with_data_type(DataType::Int32)
                .build();
            orderings.push(Ordering {
                expression: Expr::sub_statement(constant_statement),
                direction: OrderingDirection::Asc,
            });
        }

        let tuple = NewExpr {
            type_name: "KeyValuePair".to_string(),
            arguments: vec![projection, Expr::SqlRowNumber(SqlRowNumberExpr { orderings })],
            member_names: vec!["Key".to_string(), "Value".to_string()],
        };
        self.builder.data_type = Some(DataType::sequence(DataType::Object(tuple.type_name.clone())));
        self.builder.select_projection = Some(Expr::New(tuple));

        let reference = self.move_current_statement_to_sub_statement();
        let key = Expr::member(reference.clone(), "Key", projection_type);
        let row_number = Expr::member(reference, "Value", DataType::Int64);

        self.builder.select_projection = Some(key);
        self.builder.data_type = Some(original_type);
        self.builder.add_where_condition(Expr::binary(
            BinaryOperator::GreaterThan,
            row_number.clone(),
            count.clone(),
        ));
        self.builder.orderings.push(Ordering {
            expression: row_number.clone(),
            direction: OrderingDirection::Asc,
        });
        self.builder.row_number_selector = Some(row_number);
        self.builder.current_row_number_offset = Some(count);
        Ok(())
    }

    /// Turns the statement built so far into a sub-statement table of a new,
    /// empty statement that selects all of its rows. Returns the reference to
    /// that table.
    fn move_current_statement_to_sub_statement(&mut self) -> Expr {
        let mut statement = self.builder.get_statement_and_reset();
        statement.select_projection = name_sub_statement_projection(statement.select_projection);
        let item_type = statement
            .data_type
            .element_type()
            .cloned()
            .unwrap_or_else(|| statement.data_type.clone());

        let table = SqlTable::new(
            TableInfo::SubStatement(ResolvedSubStatementTableInfo {
                table_alias: self.generator.get_unique_identifier("q"),
                statement,
            }),
            JoinSemantics::Inner,
        );
        let reference = Expr::SqlTableReference(SqlTableReferenceExpr {
            table: table.id,
            data_type: item_type.clone(),
        });
        self.builder.sql_tables.push(table);
        self.builder.select_projection = Some(reference.clone());
        self.builder.data_type = Some(DataType::sequence(item_type));
        reference
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        expression::{AggregationFunction, ConstantExpr, DataType, Expr, QueryableExpr},
        query_model::{Clause, FromClause, QueryModel, QueryModelBuilder, ResultOperator, SelectClause},
        sql_preparation::prepare_query_model,
        sql_statement::{SqlStatement, TableInfo},
        utils::unique_identifier::UniqueIdentifierGenerator,
    };

    fn customers(operators: Vec<ResultOperator>) -> QueryModel {
        let c = FromClause::new(
            "c",
            "c",
            DataType::Entity("Customer".to_string()),
            Expr::Queryable(QueryableExpr {
                item_type: "Customer".to_string(),
            }),
        );
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(c.clone())).unwrap();
        builder
            .add_clause(Clause::Select(SelectClause { selector: c.reference() }))
            .unwrap();
        for operator in operators {
            builder.add_result_operator(operator);
        }
        builder
            .build(DataType::sequence(DataType::Entity("Customer".to_string())))
            .unwrap()
    }

    fn prepare(operators: Vec<ResultOperator>) -> SqlStatement {
        prepare_query_model(&customers(operators), &mut UniqueIdentifierGenerator::new()).unwrap()
    }

    fn take(count: i64) -> ResultOperator {
        ResultOperator::Take {
            count: Expr::Constant(ConstantExpr::int(count)),
        }
    }

    #[test]
    fn test_count_wraps_projection() {
        let statement = prepare(vec![ResultOperator::Count]);
        assert_eq!(statement.data_type, DataType::Int32);
        assert!(matches!(
            &statement.select_projection,
            Expr::Aggregation(a) if a.function == AggregationFunction::Count
        ));
        assert_eq!(statement.sql_tables.len(), 1);
    }

    #[test]
    fn test_count_after_take_uses_sub_statement() {
        let statement = prepare(vec![take(3), ResultOperator::Count]);
        let TableInfo::SubStatement(info) = &statement.sql_tables[0].table_info else {
            panic!("expected sub-statement");
        };
        assert!(info.statement.top_expression.is_some());
        assert!(statement.top_expression.is_none());
        assert!(matches!(statement.select_projection, Expr::Aggregation(_)));
    }

    #[test]
    fn test_take_after_take_uses_sub_statement() {
        let statement = prepare(vec![take(5), take(3)]);
        assert!(matches!(statement.sql_tables[0].table_info, TableInfo::SubStatement(_)));
        assert!(statement.top_expression.is_some());
    }

    #[test]
    fn test_first_and_single_set_top() {
        let first = prepare(vec![ResultOperator::First {
            return_default_when_empty: false,
        }]);
        assert!(matches!(first.top_expression, Some(Expr::SqlLiteral(_))));
        assert_eq!(first.data_type, DataType::Entity("Customer".to_string()));

        let single = prepare(vec![ResultOperator::Single {
            return_default_when_empty: true,
        }]);
        assert_eq!(single.top_expression.unwrap().to_string(), "2");
    }

    #[test]
    fn test_any_becomes_exists() {
        let statement = prepare(vec![ResultOperator::Any]);
        assert_eq!(statement.data_type, DataType::Boolean);
        assert!(statement.sql_tables.is_empty());
        assert!(matches!(statement.select_projection, Expr::SqlExists(_)));
    }

    #[test]
    fn test_skip_pages_over_row_number() {
        let statement = prepare(vec![
            ResultOperator::Skip {
                count: Expr::Constant(ConstantExpr::int(10)),
            },
            take(5),
        ]);
        let TableInfo::SubStatement(info) = &statement.sql_tables[0].table_info else {
            panic!("expected sub-statement");
        };
        assert!(matches!(&info.statement.select_projection, Expr::New(n) if n.member_names == ["Key", "Value"]));
        assert!(statement.row_number_selector.is_some());
        assert!(statement.top_expression.is_none());
        assert_eq!(statement.orderings.len(), 1);
        assert_eq!(statement.data_type, DataType::sequence(DataType::Entity("Customer".to_string())));
    }
}
