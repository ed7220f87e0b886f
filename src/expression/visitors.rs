//! Generic traversal over [`Expr`] trees.
//!
//! Nested statements (`SubQuery`, `SqlSubStatement`) are leaves here: every
//! pass decides for itself how to descend into a nested statement.

use std::convert::Infallible;

use super::*;

impl Expr {
    /// Rebuilds this node with `f` applied to each direct child expression.
    pub fn try_map_children<E, F>(self, f: &mut F) -> Result<Expr, E>
    where
        F: FnMut(Expr) -> Result<Expr, E>,
    {
        let boxed = |expr: Box<Expr>, f: &mut F| -> Result<Box<Expr>, E> { Ok(Box::new(f(*expr)?)) };

        Ok(match self {
            Expr::Member(e) => Expr::Member(MemberExpr {
                expression: boxed(e.expression, f)?,
                ..e
            }),
            Expr::Binary(e) => {
                let left = boxed(e.left, f)?;
                let right = boxed(e.right, f)?;
                Expr::Binary(BinaryExpr {
                    operator: e.operator,
                    left,
                    right,
                    data_type: e.data_type,
                })
            }
            Expr::Unary(e) => Expr::Unary(UnaryExpr {
                operand: boxed(e.operand, f)?,
                ..e
            }),
            Expr::Conditional(e) => {
                let test = boxed(e.test, f)?;
                let if_true = boxed(e.if_true, f)?;
                let if_false = boxed(e.if_false, f)?;
                Expr::Conditional(ConditionalExpr {
                    test,
                    if_true,
                    if_false,
                    data_type: e.data_type,
                })
            }
            Expr::New(e) => Expr::New(NewExpr {
                arguments: e.arguments.into_iter().map(&mut *f).collect::<Result<_, _>>()?,
                ..e
            }),
            Expr::Lambda(e) => Expr::Lambda(LambdaExpr {
                body: boxed(e.body, f)?,
                ..e
            }),
            Expr::Invocation(e) => {
                let expression = boxed(e.expression, f)?;
                let arguments = e.arguments.into_iter().map(&mut *f).collect::<Result<_, _>>()?;
                Expr::Invocation(InvocationExpr {
                    expression,
                    arguments,
                    data_type: e.data_type,
                })
            }
            Expr::SqlGroupingSelect(e) => {
                let key_expression = boxed(e.key_expression, f)?;
                let element_expression = boxed(e.element_expression, f)?;
                let aggregation_expressions = e
                    .aggregation_expressions
                    .into_iter()
                    .map(&mut *f)
                    .collect::<Result<_, _>>()?;
                Expr::SqlGroupingSelect(SqlGroupingSelectExpr {
                    id: e.id,
                    key_expression,
                    element_expression,
                    aggregation_expressions,
                })
            }
            Expr::SqlConvertedBoolean(e) => SqlConvertedBooleanExpr::wrap(f(*e.expression)?),
            Expr::Named(e) => Expr::Named(NamedExpr {
                expression: boxed(e.expression, f)?,
                ..e
            }),
            Expr::SqlCase(e) => {
                let cases = e
                    .cases
                    .into_iter()
                    .map(|case| {
                        Ok(CaseWhenPair {
                            when: f(case.when)?,
                            then: f(case.then)?,
                        })
                    })
                    .collect::<Result<_, E>>()?;
                let else_case = match e.else_case {
                    Some(else_case) => Some(boxed(else_case, f)?),
                    None => None,
                };
                Expr::SqlCase(SqlCaseExpr {
                    cases,
                    else_case,
                    data_type: e.data_type,
                })
            }
            Expr::SqlFunction(e) => Expr::SqlFunction(SqlFunctionExpr {
                arguments: e.arguments.into_iter().map(&mut *f).collect::<Result<_, _>>()?,
                ..e
            }),
            Expr::SqlExists(e) => Expr::SqlExists(SqlExistsExpr {
                expression: boxed(e.expression, f)?,
            }),
            Expr::SqlLength(e) => Expr::SqlLength(SqlLengthExpr {
                expression: boxed(e.expression, f)?,
            }),
            Expr::SqlRowNumber(e) => Expr::SqlRowNumber(SqlRowNumberExpr {
                orderings: e
                    .orderings
                    .into_iter()
                    .map(|ordering| {
                        Ok(Ordering {
                            expression: f(ordering.expression)?,
                            direction: ordering.direction,
                        })
                    })
                    .collect::<Result<_, E>>()?,
            }),
            Expr::SqlBinaryOperator(e) => {
                let left = boxed(e.left, f)?;
                let right = boxed(e.right, f)?;
                Expr::SqlBinaryOperator(SqlBinaryOperatorExpr {
                    operator: e.operator,
                    left,
                    right,
                    data_type: e.data_type,
                })
            }
            Expr::SqlIsNull(e) => Expr::SqlIsNull(SqlIsNullExpr {
                expression: boxed(e.expression, f)?,
            }),
            Expr::SqlIsNotNull(e) => Expr::SqlIsNotNull(SqlIsNotNullExpr {
                expression: boxed(e.expression, f)?,
            }),
            Expr::Aggregation(e) => Expr::Aggregation(AggregationExpr {
                expression: boxed(e.expression, f)?,
                ..e
            }),
            Expr::SqlCollection(e) => Expr::SqlCollection(SqlCollectionExpr {
                items: e.items.into_iter().map(&mut *f).collect::<Result<_, _>>()?,
                ..e
            }),
            leaf @ (Expr::Constant(_)
            | Expr::Queryable(_)
            | Expr::QuerySourceReference(_)
            | Expr::SubQuery(_)
            | Expr::Parameter(_)
            | Expr::SqlTableReference(_)
            | Expr::SqlEntityRefMember(_)
            | Expr::SqlColumn(_)
            | Expr::SqlEntity(_)
            | Expr::SqlSubStatement(_)
            | Expr::SqlLiteral(_)) => leaf,
        })
    }

    pub fn map_children<F>(self, f: &mut F) -> Expr
    where
        F: FnMut(Expr) -> Expr,
    {
        let mut infallible = |expr: Expr| -> Result<Expr, Infallible> { Ok(f(expr)) };
        match self.try_map_children(&mut infallible) {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }

    /// Bottom-up rewrite: children first, then `f` on the rebuilt node.
    pub fn transform_up<F>(self, f: &mut F) -> Expr
    where
        F: FnMut(Expr) -> Expr,
    {
        let rebuilt = self.map_children(&mut |child| child.transform_up(f));
        f(rebuilt)
    }

    /// Direct children, in the order `try_map_children` visits them.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Member(e) => vec![&e.expression],
            Expr::Binary(e) => vec![&e.left, &e.right],
            Expr::Unary(e) => vec![&e.operand],
            Expr::Conditional(e) => vec![&e.test, &e.if_true, &e.if_false],
            Expr::New(e) => e.arguments.iter().collect(),
            Expr::Lambda(e) => vec![&e.body],
            Expr::Invocation(e) => std::iter::once(e.expression.as_ref())
                .chain(e.arguments.iter())
                .collect(),
            Expr::SqlGroupingSelect(e) => [e.key_expression.as_ref(), e.element_expression.as_ref()]
                .into_iter()
                .chain(e.aggregation_expressions.iter())
                .collect(),
            Expr::SqlConvertedBoolean(e) => vec![&e.expression],
            Expr::Named(e) => vec![&e.expression],
            Expr::SqlCase(e) => e
                .cases
                .iter()
                .flat_map(|case| [&case.when, &case.then])
                .chain(e.else_case.as_deref())
                .collect(),
            Expr::SqlFunction(e) => e.arguments.iter().collect(),
            Expr::SqlExists(e) => vec![&e.expression],
            Expr::SqlLength(e) => vec![&e.expression],
            Expr::SqlRowNumber(e) => e.orderings.iter().map(|o| &o.expression).collect(),
            Expr::SqlBinaryOperator(e) => vec![&e.left, &e.right],
            Expr::SqlIsNull(e) => vec![&e.expression],
            Expr::SqlIsNotNull(e) => vec![&e.expression],
            Expr::Aggregation(e) => vec![&e.expression],
            Expr::SqlCollection(e) => e.items.iter().collect(),
            Expr::Constant(_)
            | Expr::Queryable(_)
            | Expr::QuerySourceReference(_)
            | Expr::SubQuery(_)
            | Expr::Parameter(_)
            | Expr::SqlTableReference(_)
            | Expr::SqlEntityRefMember(_)
            | Expr::SqlColumn(_)
            | Expr::SqlEntity(_)
            | Expr::SqlSubStatement(_)
            | Expr::SqlLiteral(_) => Vec::new(),
        }
    }

    /// Pre-order walk over this node and its descendants.
    pub fn walk<F>(&self, f: &mut F)
    where
        F: FnMut(&Expr),
    {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    pub fn any<P>(&self, predicate: &P) -> bool
    where
        P: Fn(&Expr) -> bool,
    {
        predicate(self) || self.children().into_iter().any(|child| child.any(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> Expr {
        Expr::Constant(ConstantExpr::int(value))
    }

    #[test]
    fn test_transform_up_rewrites_every_leaf() {
        let expr = Expr::binary(BinaryOperator::Add, int(1), Expr::binary(BinaryOperator::Add, int(2), int(3)));
        let doubled = expr.transform_up(&mut |e| match e {
            Expr::Constant(ConstantExpr {
                value: Value::Int(i),
                data_type,
            }) => Expr::Constant(ConstantExpr {
                value: Value::Int(i * 2),
                data_type,
            }),
            other => other,
        });

        let mut seen = Vec::new();
        doubled.walk(&mut |e| {
            if let Expr::Constant(ConstantExpr { value: Value::Int(i), .. }) = e {
                seen.push(*i);
            }
        });
        assert_eq!(seen, vec![2, 4, 6]);
    }

    #[test]
    fn test_try_map_children_stops_on_error() {
        let expr = Expr::binary(BinaryOperator::Add, int(1), int(2));
        let result: Result<Expr, String> = expr.try_map_children(&mut |_| Err("boom".to_string()));
        assert_eq!(result, Err("boom".to_string()));
    }

    #[test]
    fn test_any_finds_nested_node() {
        let expr = Expr::not(Expr::is_null(int(1)));
        assert!(expr.any(&|e| matches!(e, Expr::SqlIsNull(_))));
        assert!(!expr.any(&|e| matches!(e, Expr::SqlExists(_))));
    }
}
