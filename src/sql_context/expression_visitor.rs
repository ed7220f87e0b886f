use log::trace;

use super::{errors::SqlContextError, named_expression_combiner::process_names, SqlExpressionContext};
use crate::{
    expression::{
        AggregationExpr, BinaryExpr, BinaryOperator, CaseWhenPair, ConditionalExpr, ConstantExpr, DataType, Expr,
        NewExpr, Ordering, SqlBinaryOperatorExpr, SqlCaseExpr, SqlCollectionExpr, SqlConvertedBooleanExpr,
        SqlExistsExpr, SqlFunctionExpr, SqlLengthExpr, SqlLiteralExpr, SqlRowNumberExpr, UnaryExpr, UnaryOperator,
        Value,
    },
    mapping::MappingResolutionContext,
    sql_statement::SqlStatement,
};

use SqlExpressionContext::{PredicateRequired, SingleValueRequired, ValueRequired};

/// Rewrites an expression tree for the SQL position it occupies.
///
/// Every node is visited under the context its parent requires. Boolean
/// leaves always become integer values wrapped in a converted-boolean marker;
/// the context of the position then decides whether the marker stays (value
/// positions) or is compared against `1` (predicate positions).
pub(super) struct SqlContextExpressionVisitor<'a> {
    pub(super) mapping_context: &'a mut MappingResolutionContext,
}

impl<'a> SqlContextExpressionVisitor<'a> {
    pub(super) fn new(mapping_context: &'a mut MappingResolutionContext) -> Self {
        SqlContextExpressionVisitor { mapping_context }
    }

    pub(super) fn apply(&mut self, expr: Expr, context: SqlExpressionContext) -> Result<Expr, SqlContextError> {
        let visited = self.visit(expr, context)?;
        match context {
            ValueRequired | SingleValueRequired => Ok(handle_value_semantics(visited)),
            PredicateRequired => handle_predicate_semantics(visited),
        }
    }

    fn apply_all(&mut self, exprs: Vec<Expr>, context: SqlExpressionContext) -> Result<Vec<Expr>, SqlContextError> {
        exprs.into_iter().map(|e| self.apply(e, context)).collect()
    }

    fn apply_boxed(&mut self, expr: Box<Expr>, context: SqlExpressionContext) -> Result<Box<Expr>, SqlContextError> {
        Ok(Box::new(self.apply(*expr, context)?))
    }

    pub(super) fn apply_orderings(&mut self, orderings: Vec<Ordering>) -> Result<Vec<Ordering>, SqlContextError> {
        orderings
            .into_iter()
            .map(|ordering| {
                Ok(Ordering {
                    expression: self.apply(ordering.expression, SingleValueRequired)?,
                    direction: ordering.direction,
                })
            })
            .collect()
    }

    fn visit(&mut self, expr: Expr, context: SqlExpressionContext) -> Result<Expr, SqlContextError> {
        match expr {
            Expr::Constant(constant) if constant.data_type.is_boolean() => Ok(convert_boolean_constant(constant)),
            Expr::SqlColumn(column) if column.data_type.is_boolean() => {
                let int_type = column.data_type.matching_int_type();
                Ok(SqlConvertedBooleanExpr::wrap(Expr::column(column.with_data_type(int_type))))
            }
            leaf @ (Expr::Constant(_) | Expr::SqlColumn(_) | Expr::SqlLiteral(_)) => Ok(leaf),
            Expr::SqlEntity(entity) => match context {
                SingleValueRequired => self.visit(Expr::SqlColumn(entity.primary_key_column), context),
                _ => Ok(Expr::SqlEntity(entity)),
            },
            Expr::SqlConvertedBoolean(converted) => Ok(SqlConvertedBooleanExpr::wrap(
                self.apply(*converted.expression, SingleValueRequired)?,
            )),
            Expr::Binary(binary) => self.visit_binary(binary, context),
            Expr::Unary(unary) => self.visit_unary(unary, context),
            Expr::Conditional(conditional) => self.visit_conditional(conditional),
            Expr::SqlCase(case) => self.visit_case(case),
            Expr::New(new) => {
                if context == SingleValueRequired {
                    return Err(SqlContextError::MultipleValuesInSingleValuePosition(Expr::New(new).to_string()));
                }
                Ok(Expr::New(NewExpr {
                    arguments: self.apply_all(new.arguments, ValueRequired)?,
                    ..new
                }))
            }
            Expr::Named(named) => {
                let inner = self.apply(*named.expression, context)?;
                Ok(process_names(named.name, inner, self.mapping_context))
            }
            Expr::SqlSubStatement(sub_statement) => self.visit_sub_statement(*sub_statement.statement, context),
            Expr::SqlGroupingSelect(grouping) => {
                if context == SingleValueRequired {
                    return Err(SqlContextError::MultipleValuesInSingleValuePosition(
                        Expr::SqlGroupingSelect(grouping).to_string(),
                    ));
                }
                let key = self.apply((*grouping.key_expression).clone(), ValueRequired)?;
                let element = self.apply((*grouping.element_expression).clone(), ValueRequired)?;
                let aggregations = self.apply_all(grouping.aggregation_expressions.clone(), ValueRequired)?;
                if &key == grouping.key_expression.as_ref()
                    && &element == grouping.element_expression.as_ref()
                    && aggregations == grouping.aggregation_expressions
                {
                    return Ok(Expr::SqlGroupingSelect(grouping));
                }
                Ok(Expr::SqlGroupingSelect(
                    self.mapping_context
                        .update_grouping_select_and_add_mapping(&grouping, key, element, aggregations),
                ))
            }
            Expr::SqlFunction(function) => Ok(Expr::SqlFunction(SqlFunctionExpr {
                arguments: self.apply_all(function.arguments, SingleValueRequired)?,
                ..function
            })),
            Expr::SqlExists(exists) => Ok(Expr::SqlExists(SqlExistsExpr {
                expression: self.apply_boxed(exists.expression, SingleValueRequired)?,
            })),
            Expr::SqlLength(length) => Ok(Expr::SqlLength(SqlLengthExpr {
                expression: self.apply_boxed(length.expression, SingleValueRequired)?,
            })),
            Expr::SqlRowNumber(row_number) => Ok(Expr::SqlRowNumber(SqlRowNumberExpr {
                orderings: self.apply_orderings(row_number.orderings)?,
            })),
            Expr::SqlBinaryOperator(binary) => {
                let left = unwrap_marker(self.apply(*binary.left, SingleValueRequired)?);
                let right = unwrap_marker(self.apply(*binary.right, SingleValueRequired)?);
                Ok(Expr::SqlBinaryOperator(SqlBinaryOperatorExpr {
                    left: Box::new(left),
                    right: Box::new(right),
                    ..binary
                }))
            }
            Expr::SqlIsNull(is_null) => Ok(Expr::is_null(unwrap_marker(
                self.apply(*is_null.expression, SingleValueRequired)?,
            ))),
            Expr::SqlIsNotNull(is_not_null) => Ok(Expr::is_not_null(unwrap_marker(
                self.apply(*is_not_null.expression, SingleValueRequired)?,
            ))),
            Expr::Aggregation(aggregation) => {
                let operand = self.apply(*aggregation.expression, SingleValueRequired)?;
                match operand {
                    Expr::SqlConvertedBoolean(converted) if aggregation.data_type.is_boolean() => {
                        Ok(SqlConvertedBooleanExpr::wrap(Expr::Aggregation(AggregationExpr {
                            function: aggregation.function,
                            expression: converted.expression,
                            data_type: aggregation.data_type.matching_int_type(),
                        })))
                    }
                    operand => Ok(Expr::Aggregation(AggregationExpr {
                        expression: Box::new(unwrap_marker(operand)),
                        ..aggregation
                    })),
                }
            }
            Expr::SqlCollection(collection) => Ok(Expr::SqlCollection(SqlCollectionExpr {
                items: self.apply_all(collection.items, SingleValueRequired)?,
                ..collection
            })),
            unsupported @ (Expr::Queryable(_)
            | Expr::QuerySourceReference(_)
            | Expr::SubQuery(_)
            | Expr::Member(_)
            | Expr::Parameter(_)
            | Expr::Lambda(_)
            | Expr::Invocation(_)
            | Expr::SqlTableReference(_)
            | Expr::SqlEntityRefMember(_)) => Err(SqlContextError::unsupported(&unsupported)),
        }
    }

    fn visit_binary(&mut self, binary: BinaryExpr, context: SqlExpressionContext) -> Result<Expr, SqlContextError> {
        let BinaryExpr {
            operator,
            left,
            right,
            data_type,
        } = binary;

        // NULL is already false in a predicate, so `x ?? false` is just `x`.
        if operator == BinaryOperator::Coalesce
            && context == PredicateRequired
            && right.is_constant_value(&Value::Bool(false))
        {
            trace!("SqlContext: dropping '?? false' in predicate position");
            return self.apply(*left, PredicateRequired);
        }

        if operator.is_logical() && data_type.is_boolean() {
            let left = self.apply(*left, PredicateRequired)?;
            let right = self.apply(*right, PredicateRequired)?;
            return Ok(Expr::binary_with_type(operator, left, right, data_type));
        }

        let operand_context = if operator.is_equality() || operator == BinaryOperator::Coalesce {
            SingleValueRequired
        } else {
            ValueRequired
        };
        let left = self.apply(*left, operand_context)?;
        let right = self.apply(*right, operand_context)?;

        match (left, right) {
            (Expr::SqlConvertedBoolean(left), Expr::SqlConvertedBoolean(right))
                if operator == BinaryOperator::Coalesce =>
            {
                Ok(SqlConvertedBooleanExpr::wrap(Expr::binary_with_type(
                    operator,
                    *left.expression,
                    *right.expression,
                    data_type.matching_int_type(),
                )))
            }
            (left, right) if operator.is_comparison() => Ok(Expr::binary_with_type(
                operator,
                unwrap_marker(left),
                unwrap_marker(right),
                data_type,
            )),
            (left, right) => Ok(Expr::binary_with_type(operator, left, right, data_type)),
        }
    }

    fn visit_unary(&mut self, unary: UnaryExpr, context: SqlExpressionContext) -> Result<Expr, SqlContextError> {
        let UnaryExpr {
            operator,
            operand,
            data_type,
        } = unary;

        let operand = match operator {
            UnaryOperator::Not if data_type.is_boolean() => self.apply(*operand, PredicateRequired)?,
            UnaryOperator::Convert if data_type.is_boolean() && operand.data_type().is_boolean() => {
                match self.apply(*operand, context)? {
                    Expr::SqlConvertedBoolean(converted) => {
                        return Ok(SqlConvertedBooleanExpr::wrap(Expr::convert(
                            *converted.expression,
                            data_type.matching_int_type(),
                        )));
                    }
                    predicate => predicate,
                }
            }
            UnaryOperator::Not | UnaryOperator::Negate | UnaryOperator::Convert => {
                unwrap_marker(self.apply(*operand, SingleValueRequired)?)
            }
        };
        Ok(Expr::Unary(UnaryExpr {
            operator,
            operand: Box::new(operand),
            data_type,
        }))
    }

    fn visit_conditional(&mut self, conditional: ConditionalExpr) -> Result<Expr, SqlContextError> {
        let test = self.apply_boxed(conditional.test, PredicateRequired)?;
        let if_true = self.apply(*conditional.if_true, SingleValueRequired)?;
        let if_false = self.apply(*conditional.if_false, SingleValueRequired)?;

        Ok(match (if_true, if_false) {
            (Expr::SqlConvertedBoolean(if_true), Expr::SqlConvertedBoolean(if_false)) => {
                SqlConvertedBooleanExpr::wrap(Expr::Conditional(ConditionalExpr {
                    test,
                    if_true: if_true.expression,
                    if_false: if_false.expression,
                    data_type: conditional.data_type.matching_int_type(),
                }))
            }
            (if_true, if_false) => Expr::Conditional(ConditionalExpr {
                test,
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
                data_type: conditional.data_type,
            }),
        })
    }

    fn visit_case(&mut self, case: SqlCaseExpr) -> Result<Expr, SqlContextError> {
        let cases = case
            .cases
            .into_iter()
            .map(|pair| {
                Ok(CaseWhenPair {
                    when: self.apply(pair.when, PredicateRequired)?,
                    then: self.apply(pair.then, SingleValueRequired)?,
                })
            })
            .collect::<Result<Vec<_>, SqlContextError>>()?;
        let else_case = case
            .else_case
            .map(|else_case| self.apply_boxed(else_case, SingleValueRequired))
            .transpose()?;

        let all_converted = cases.iter().all(|pair| pair.then.as_converted_boolean().is_some())
            && else_case
                .as_ref()
                .map_or(true, |else_case| else_case.as_converted_boolean().is_some());
        if !all_converted {
            return Ok(Expr::SqlCase(SqlCaseExpr {
                cases,
                else_case,
                data_type: case.data_type,
            }));
        }

        Ok(SqlConvertedBooleanExpr::wrap(Expr::SqlCase(SqlCaseExpr {
            cases: cases
                .into_iter()
                .map(|pair| CaseWhenPair {
                    when: pair.when,
                    then: unwrap_marker(pair.then),
                })
                .collect(),
            else_case: else_case.map(|else_case| Box::new(unwrap_marker(*else_case))),
            data_type: case.data_type.matching_int_type(),
        })))
    }

    /// The inner projection is contextualized on its own; a single boolean
    /// result surfaces as a marker around the whole sub-statement.
    fn visit_sub_statement(
        &mut self,
        statement: SqlStatement,
        context: SqlExpressionContext,
    ) -> Result<Expr, SqlContextError> {
        let selection_context = match context {
            PredicateRequired => SingleValueRequired,
            other => other,
        };
        let mut statement = self.apply_to_statement(statement, selection_context)?;

        if matches!(statement.data_type, DataType::Sequence(_)) {
            return Ok(Expr::sub_statement(statement));
        }
        match std::mem::replace(&mut statement.select_projection, Expr::bool_constant(true)) {
            Expr::SqlConvertedBoolean(converted) => {
                statement.select_projection = *converted.expression;
                statement.data_type = statement.data_type.matching_int_type();
                Ok(SqlConvertedBooleanExpr::wrap(Expr::sub_statement(statement)))
            }
            projection => {
                statement.select_projection = projection;
                Ok(Expr::sub_statement(statement))
            }
        }
    }
}

fn convert_boolean_constant(constant: ConstantExpr) -> Expr {
    let value = match constant.value {
        Value::Bool(value) => Value::Int(i64::from(value)),
        other => other,
    };
    SqlConvertedBooleanExpr::wrap(Expr::Constant(ConstantExpr {
        value,
        data_type: constant.data_type.matching_int_type(),
    }))
}

fn unwrap_marker(expr: Expr) -> Expr {
    match expr {
        Expr::SqlConvertedBoolean(converted) => *converted.expression,
        other => other,
    }
}

/// Value positions: predicates become `CASE WHEN p THEN 1 ELSE 0 END` under a marker.
fn handle_value_semantics(expr: Expr) -> Expr {
    let data_type = expr.data_type();
    match expr {
        marker @ Expr::SqlConvertedBoolean(_) => marker,
        predicate if data_type.is_boolean() => {
            let case = if data_type.is_nullable() {
                SqlCaseExpr::if_then_else_null(
                    DataType::nullable(DataType::Int32),
                    predicate,
                    SqlLiteralExpr::nullable_int(1),
                    SqlLiteralExpr::nullable_int(0),
                )
            } else {
                SqlCaseExpr::if_then_else(DataType::Int32, predicate, SqlLiteralExpr::int(1), SqlLiteralExpr::int(0))
            };
            SqlConvertedBooleanExpr::wrap(Expr::SqlCase(case))
        }
        other => other,
    }
}

/// Predicate positions: markers are compared against `1`, anything else
/// must already be a predicate.
fn handle_predicate_semantics(expr: Expr) -> Result<Expr, SqlContextError> {
    match expr {
        Expr::SqlConvertedBoolean(converted) => {
            let value = *converted.expression;
            Ok(if value.data_type().is_nullable() {
                Expr::binary_with_type(
                    BinaryOperator::Equal,
                    value,
                    SqlLiteralExpr::nullable_int(1),
                    DataType::nullable(DataType::Boolean),
                )
            } else {
                Expr::binary_with_type(BinaryOperator::Equal, value, SqlLiteralExpr::int(1), DataType::Boolean)
            })
        }
        predicate if predicate.data_type().is_boolean() => Ok(predicate),
        other => Err(SqlContextError::NonBooleanInPredicate {
            data_type: other.data_type().to_string(),
            expression: other.to_string(),
        }),
    }
}
