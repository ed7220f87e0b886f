use std::fmt;

use super::*;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::AndAlso => "AND",
            BinaryOperator::OrElse => "OR",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::ExclusiveOr => "^",
            BinaryOperator::Coalesce => "??",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationFunction::Count => "COUNT",
            AggregationFunction::Sum => "SUM",
            AggregationFunction::Min => "MIN",
            AggregationFunction::Max => "MAX",
            AggregationFunction::Average => "AVG",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for SqlColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}].[{}]", self.table_alias, self.column_name)
    }
}

impl fmt::Display for SqlEntityExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.table_alias)?;
        if let Some(name) = &self.name {
            write!(f, " AS [{}]", name)?;
        }
        Ok(())
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderingDirection::Asc => write!(f, "{} ASC", self.expression),
            OrderingDirection::Desc => write!(f, "{} DESC", self.expression),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(e) => write!(f, "{}", e.value),
            Expr::Queryable(e) => write!(f, "Queryable<{}>", e.item_type),
            Expr::QuerySourceReference(e) => write!(f, "[{}]", e.clause),
            Expr::SubQuery(e) => write!(f, "{{{}}}", e.query_model),
            Expr::Member(e) => write!(f, "{}.{}", e.expression, e.member_name),
            Expr::Binary(e) => write!(f, "({} {} {})", e.left, e.operator, e.right),
            Expr::Unary(e) => match e.operator {
                UnaryOperator::Not => write!(f, "NOT ({})", e.operand),
                UnaryOperator::Negate => write!(f, "-({})", e.operand),
                UnaryOperator::Convert => write!(f, "CONVERT({}, {})", e.data_type, e.operand),
            },
            Expr::Conditional(e) => write!(f, "({} ? {} : {})", e.test, e.if_true, e.if_false),
            Expr::New(e) => {
                write!(f, "new {}(", e.type_name)?;
                for (i, (name, argument)) in e.member_names.iter().zip(&e.arguments).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, argument)?;
                }
                write!(f, ")")
            }
            Expr::Parameter(e) => write!(f, "@{}", e.name),
            Expr::Lambda(e) => {
                let names: Vec<&str> = e.parameters.iter().map(|p| p.name.as_str()).collect();
                write!(f, "({}) => {}", names.join(", "), e.body)
            }
            Expr::Invocation(e) => {
                write!(f, "{}(", e.expression)?;
                write_list(f, &e.arguments)?;
                write!(f, ")")
            }
            Expr::SqlTableReference(e) => write!(f, "TABLE-REF({})", e.table),
            Expr::SqlEntityRefMember(e) => {
                write!(f, "{}.{}", e.originating_entity, e.member_name)
            }
            Expr::SqlColumn(e) => write!(f, "{}", e),
            Expr::SqlEntity(e) => write!(f, "{}", e),
            Expr::SqlGroupingSelect(e) => {
                write!(f, "GROUPING (KEY: {}, ELEMENT: {}, AGGREGATIONS: (", e.key_expression, e.element_expression)?;
                write_list(f, &e.aggregation_expressions)?;
                write!(f, "))")
            }
            Expr::SqlConvertedBoolean(e) => write!(f, "ConvertedBoolean({})", e.expression),
            Expr::SqlSubStatement(e) => write!(f, "({})", e.statement),
            Expr::Named(e) => match &e.name {
                Some(name) => write!(f, "{} AS [{}]", e.expression, name),
                None => write!(f, "{} AS [value]", e.expression),
            },
            Expr::SqlCase(e) => {
                write!(f, "CASE")?;
                for case in &e.cases {
                    write!(f, " WHEN {} THEN {}", case.when, case.then)?;
                }
                if let Some(else_case) = &e.else_case {
                    write!(f, " ELSE {}", else_case)?;
                }
                write!(f, " END")
            }
            Expr::SqlFunction(e) => {
                write!(f, "{}(", e.name)?;
                write_list(f, &e.arguments)?;
                write!(f, ")")
            }
            Expr::SqlExists(e) => write!(f, "EXISTS({})", e.expression),
            Expr::SqlLength(e) => write!(f, "LEN({})", e.expression),
            Expr::SqlRowNumber(e) => {
                write!(f, "ROW_NUMBER() OVER (ORDER BY ")?;
                for (i, ordering) in e.orderings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", ordering)?;
                }
                write!(f, ")")
            }
            Expr::SqlLiteral(e) => write!(f, "{}", e.value),
            Expr::SqlBinaryOperator(e) => write!(f, "{} {} {}", e.left, e.operator, e.right),
            Expr::SqlIsNull(e) => write!(f, "{} IS NULL", e.expression),
            Expr::SqlIsNotNull(e) => write!(f, "{} IS NOT NULL", e.expression),
            Expr::Aggregation(e) => write!(f, "{}({})", e.function, e.expression),
            Expr::SqlCollection(e) => {
                write!(f, "(")?;
                write_list(f, &e.items)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_column_comparison() {
        let expr = Expr::equal(
            Expr::column(SqlColumnExpr::new("t0", "Name", DataType::String, false)),
            Expr::Constant(ConstantExpr::string("O'Brien")),
        );
        assert_eq!(expr.to_string(), "([t0].[Name] = 'O''Brien')");
    }

    #[test]
    fn test_display_case() {
        let case = SqlCaseExpr::if_then_else(
            DataType::Int32,
            Expr::bool_constant(true),
            SqlLiteralExpr::int(1),
            SqlLiteralExpr::int(0),
        );
        assert_eq!(Expr::SqlCase(case).to_string(), "CASE WHEN true THEN 1 ELSE 0 END");
    }
}
