//! Expression nodes.
//!
//! [`Expr`] is the single closed node type used from the parsed query model
//! all the way to the contextualized SQL statement. Variants fall into three
//! groups:
//!
//! - **query level**: produced by the upstream parser (`Constant`, `Member`,
//!   `QuerySourceReference`, `SubQuery`, ...)
//! - **unresolved SQL**: produced by preparation, removed by the mapping
//!   resolution stage (`SqlTableReference`, `SqlEntityRefMember`)
//! - **resolved SQL**: what the context rewriter and SQL generators see
//!   (`SqlColumn`, `SqlEntity`, `SqlConvertedBoolean`, ...)
//!
//! Every pass matches exhaustively over the variants, so adding a node kind
//! forces every pass to decide what to do with it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod data_type;
mod display;
pub mod visitors;

pub use data_type::DataType;

use crate::{
    query_model::{ClauseId, QueryModel},
    sql_statement::{SqlStatement, TableId},
};

/// Identity of an entity or grouping expression.
///
/// Mapping lookups are keyed by identity, not by structure: two entities with
/// identical columns coming from different tables must not be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprId(Uuid);

impl ExprId {
    pub fn new() -> Self {
        ExprId(Uuid::new_v4())
    }
}

impl Default for ExprId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value of the source language (booleans included).
    Constant(ConstantExpr),

    /// The root sequence of a mapped item type, e.g. "all customers".
    Queryable(QueryableExpr),

    /// Reference to the item of a from-clause of the query model.
    QuerySourceReference(QuerySourceReferenceExpr),

    /// A nested query model.
    SubQuery(SubQueryExpr),

    /// Member access, e.g. `c.Name` or `o.Customer`.
    Member(MemberExpr),

    Binary(BinaryExpr),

    Unary(UnaryExpr),

    /// `test ? if_true : if_false`
    Conditional(ConditionalExpr),

    /// Construction of a projected tuple.
    New(NewExpr),

    Parameter(ParameterExpr),

    /// Lambdas have no SQL representation; the context rewriter rejects them.
    Lambda(LambdaExpr),

    /// Delegate invocation; rejected like lambdas.
    Invocation(InvocationExpr),

    /// Reference to a table of the statement whose item has not been turned
    /// into an entity yet.
    SqlTableReference(SqlTableReferenceExpr),

    /// Navigation from an entity to a related entity.
    SqlEntityRefMember(SqlEntityRefMemberExpr),

    SqlColumn(SqlColumnExpr),

    SqlEntity(SqlEntityExpr),

    SqlGroupingSelect(SqlGroupingSelectExpr),

    /// Marks an integer expression that stands for a boolean value.
    SqlConvertedBoolean(SqlConvertedBooleanExpr),

    /// An embedded statement, e.g. a scalar subquery.
    SqlSubStatement(SqlSubStatementExpr),

    /// Gives a projected value a column name.
    Named(NamedExpr),

    SqlCase(SqlCaseExpr),

    SqlFunction(SqlFunctionExpr),

    SqlExists(SqlExistsExpr),

    SqlLength(SqlLengthExpr),

    SqlRowNumber(SqlRowNumberExpr),

    /// A literal emitted verbatim into SQL (as opposed to a parameter).
    SqlLiteral(SqlLiteralExpr),

    /// SQL-specific binary operators such as `IN` or `LIKE`.
    SqlBinaryOperator(SqlBinaryOperatorExpr),

    SqlIsNull(SqlIsNullExpr),

    SqlIsNotNull(SqlIsNotNullExpr),

    Aggregation(AggregationExpr),

    /// A list of values, e.g. the right side of `IN`.
    SqlCollection(SqlCollectionExpr),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ConstantExpr {
    pub value: Value,
    pub data_type: DataType,
}

impl ConstantExpr {
    pub fn bool(value: bool) -> Self {
        ConstantExpr {
            value: Value::Bool(value),
            data_type: DataType::Boolean,
        }
    }

    pub fn int(value: i64) -> Self {
        ConstantExpr {
            value: Value::Int(value),
            data_type: DataType::Int32,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        ConstantExpr {
            value: Value::Str(value.into()),
            data_type: DataType::String,
        }
    }

    pub fn null(data_type: DataType) -> Self {
        ConstantExpr {
            value: Value::Null,
            data_type: data_type.make_nullable(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct QueryableExpr {
    pub item_type: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct QuerySourceReferenceExpr {
    pub clause: ClauseId,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SubQueryExpr {
    pub query_model: Box<QueryModel>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MemberExpr {
    pub expression: Box<Expr>,
    pub member_name: String,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    And,
    Or,
    ExclusiveOr,
    Coalesce,
}

impl BinaryOperator {
    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOperator::Equal | BinaryOperator::NotEqual)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    /// `AndAlso`, `OrElse` and the non-short-circuiting `And`, `Or`, `ExclusiveOr`.
    pub fn is_logical(self) -> bool {
        matches!(
            self,
            BinaryOperator::AndAlso
                | BinaryOperator::OrElse
                | BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::ExclusiveOr
        )
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub operator: BinaryOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
    Convert,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: UnaryOperator,
    pub operand: Box<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ConditionalExpr {
    pub test: Box<Expr>,
    pub if_true: Box<Expr>,
    pub if_false: Box<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NewExpr {
    pub type_name: String,
    pub arguments: Vec<Expr>,
    /// Member names, parallel to `arguments`.
    pub member_names: Vec<String>,
}

impl NewExpr {
    pub fn argument_for(&self, member_name: &str) -> Option<&Expr> {
        self.member_names
            .iter()
            .position(|name| name == member_name)
            .and_then(|index| self.arguments.get(index))
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ParameterExpr {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub parameters: Vec<ParameterExpr>,
    pub body: Box<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InvocationExpr {
    pub expression: Box<Expr>,
    pub arguments: Vec<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlTableReferenceExpr {
    pub table: TableId,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlEntityRefMemberExpr {
    pub originating_entity: SqlEntityExpr,
    pub member_name: String,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlColumnExpr {
    pub table_alias: String,
    pub column_name: String,
    pub data_type: DataType,
    pub is_primary_key: bool,
}

impl SqlColumnExpr {
    pub fn new(
        table_alias: impl Into<String>,
        column_name: impl Into<String>,
        data_type: DataType,
        is_primary_key: bool,
    ) -> Self {
        SqlColumnExpr {
            table_alias: table_alias.into(),
            column_name: column_name.into(),
            data_type,
            is_primary_key,
        }
    }

    pub fn with_data_type(&self, data_type: DataType) -> Self {
        SqlColumnExpr {
            data_type,
            ..self.clone()
        }
    }

    pub fn with_table_alias(&self, table_alias: &str) -> Self {
        SqlColumnExpr {
            table_alias: table_alias.to_string(),
            ..self.clone()
        }
    }
}

/// A table-bound entity: one row of a mapped table.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlEntityExpr {
    pub id: ExprId,
    pub item_type: String,
    pub table_alias: String,
    pub name: Option<String>,
    pub primary_key_column: SqlColumnExpr,
    /// All mapped columns in declaration order, primary key included.
    pub columns: Vec<SqlColumnExpr>,
}

impl SqlEntityExpr {
    pub fn new(
        item_type: impl Into<String>,
        table_alias: impl Into<String>,
        name: Option<String>,
        primary_key_column: SqlColumnExpr,
        columns: Vec<SqlColumnExpr>,
    ) -> Self {
        SqlEntityExpr {
            id: ExprId::new(),
            item_type: item_type.into(),
            table_alias: table_alias.into(),
            name,
            primary_key_column,
            columns,
        }
    }

    pub fn data_type(&self) -> DataType {
        DataType::Entity(self.item_type.clone())
    }

    /// A copy bound to `table_alias` and carrying `name`, with a fresh identity.
    pub fn update(&self, table_alias: &str, name: Option<String>) -> SqlEntityExpr {
        SqlEntityExpr {
            id: ExprId::new(),
            item_type: self.item_type.clone(),
            table_alias: table_alias.to_string(),
            name,
            primary_key_column: self.primary_key_column.with_table_alias(table_alias),
            columns: self
                .columns
                .iter()
                .map(|column| column.with_table_alias(table_alias))
                .collect(),
        }
    }

    pub fn column(&self, column_name: &str) -> Option<&SqlColumnExpr> {
        self.columns
            .iter()
            .find(|column| column.column_name == column_name)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlGroupingSelectExpr {
    pub id: ExprId,
    pub key_expression: Box<Expr>,
    pub element_expression: Box<Expr>,
    pub aggregation_expressions: Vec<Expr>,
}

impl SqlGroupingSelectExpr {
    pub fn new(key_expression: Expr, element_expression: Expr, aggregation_expressions: Vec<Expr>) -> Self {
        SqlGroupingSelectExpr {
            id: ExprId::new(),
            key_expression: Box::new(key_expression),
            element_expression: Box::new(element_expression),
            aggregation_expressions,
        }
    }

    pub fn data_type(&self) -> DataType {
        DataType::Grouping {
            key: Box::new(self.key_expression.data_type()),
            element: Box::new(self.element_expression.data_type()),
        }
    }

    /// A copy with the given parts and a fresh identity.
    pub fn update(&self, key_expression: Expr, element_expression: Expr, aggregation_expressions: Vec<Expr>) -> Self {
        SqlGroupingSelectExpr::new(key_expression, element_expression, aggregation_expressions)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlConvertedBooleanExpr {
    pub expression: Box<Expr>,
}

impl SqlConvertedBooleanExpr {
    /// Wraps `expression`. A marker is never placed around another marker.
    pub fn wrap(expression: Expr) -> Expr {
        match expression {
            Expr::SqlConvertedBoolean(_) => expression,
            other => Expr::SqlConvertedBoolean(SqlConvertedBooleanExpr {
                expression: Box::new(other),
            }),
        }
    }

    pub fn data_type(&self) -> DataType {
        if self.expression.data_type().is_nullable() {
            DataType::nullable(DataType::Boolean)
        } else {
            DataType::Boolean
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlSubStatementExpr {
    pub statement: Box<SqlStatement>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NamedExpr {
    pub name: Option<String>,
    pub expression: Box<Expr>,
}

impl NamedExpr {
    pub fn wrap(name: Option<String>, expression: Expr) -> Expr {
        Expr::Named(NamedExpr {
            name,
            expression: Box::new(expression),
        })
    }

    /// Names every argument of `new` after the member it initializes, so the
    /// columns of a projected tuple can be referenced from outside.
    pub fn create_new_expression_with_names(new: NewExpr) -> NewExpr {
        let arguments = new
            .arguments
            .into_iter()
            .zip(new.member_names.iter())
            .map(|(argument, member_name)| match argument {
                Expr::Named(_) => argument,
                other => NamedExpr::wrap(Some(member_name.clone()), other),
            })
            .collect();
        NewExpr {
            type_name: new.type_name,
            arguments,
            member_names: new.member_names,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CaseWhenPair {
    pub when: Expr,
    pub then: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlCaseExpr {
    pub cases: Vec<CaseWhenPair>,
    pub else_case: Option<Box<Expr>>,
    pub data_type: DataType,
}

impl SqlCaseExpr {
    /// `CASE WHEN test THEN if_true ELSE if_false END`
    pub fn if_then_else(data_type: DataType, test: Expr, if_true: Expr, if_false: Expr) -> Self {
        SqlCaseExpr {
            cases: vec![CaseWhenPair {
                when: test,
                then: if_true,
            }],
            else_case: Some(Box::new(if_false)),
            data_type,
        }
    }

    /// `CASE WHEN test THEN if_true WHEN NOT test THEN if_false ELSE NULL END`
    pub fn if_then_else_null(data_type: DataType, test: Expr, if_true: Expr, if_false: Expr) -> Self {
        let negated = Expr::not(test.clone());
        SqlCaseExpr {
            cases: vec![
                CaseWhenPair {
                    when: test,
                    then: if_true,
                },
                CaseWhenPair {
                    when: negated,
                    then: if_false,
                },
            ],
            else_case: None,
            data_type,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlFunctionExpr {
    pub name: String,
    pub arguments: Vec<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlExistsExpr {
    pub expression: Box<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlLengthExpr {
    pub expression: Box<Expr>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum OrderingDirection {
    Asc,
    Desc,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Ordering {
    pub expression: Expr,
    pub direction: OrderingDirection,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlRowNumberExpr {
    pub orderings: Vec<Ordering>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlLiteralExpr {
    pub value: Value,
    pub data_type: DataType,
}

impl SqlLiteralExpr {
    pub fn int(value: i64) -> Expr {
        Expr::SqlLiteral(SqlLiteralExpr {
            value: Value::Int(value),
            data_type: DataType::Int32,
        })
    }

    pub fn nullable_int(value: i64) -> Expr {
        Expr::SqlLiteral(SqlLiteralExpr {
            value: Value::Int(value),
            data_type: DataType::nullable(DataType::Int32),
        })
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlBinaryOperatorExpr {
    pub operator: String,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlIsNullExpr {
    pub expression: Box<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlIsNotNullExpr {
    pub expression: Box<Expr>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum AggregationFunction {
    Count,
    Sum,
    Min,
    Max,
    Average,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AggregationExpr {
    pub function: AggregationFunction,
    pub expression: Box<Expr>,
    pub data_type: DataType,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlCollectionExpr {
    pub items: Vec<Expr>,
    pub data_type: DataType,
}

impl Expr {
    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Constant(e) => e.data_type.clone(),
            Expr::Queryable(e) => DataType::sequence(DataType::Entity(e.item_type.clone())),
            Expr::QuerySourceReference(e) => e.data_type.clone(),
            Expr::SubQuery(e) => e.query_model.result_type.clone(),
            Expr::Member(e) => e.data_type.clone(),
            Expr::Binary(e) => e.data_type.clone(),
            Expr::Unary(e) => e.data_type.clone(),
            Expr::Conditional(e) => e.data_type.clone(),
            Expr::New(e) => DataType::Object(e.type_name.clone()),
            Expr::Parameter(e) => e.data_type.clone(),
            Expr::Lambda(e) => e.body.data_type(),
            Expr::Invocation(e) => e.data_type.clone(),
            Expr::SqlTableReference(e) => e.data_type.clone(),
            Expr::SqlEntityRefMember(e) => e.data_type.clone(),
            Expr::SqlColumn(e) => e.data_type.clone(),
            Expr::SqlEntity(e) => e.data_type(),
            Expr::SqlGroupingSelect(e) => e.data_type(),
            Expr::SqlConvertedBoolean(e) => e.data_type(),
            Expr::SqlSubStatement(e) => e.statement.data_type.clone(),
            Expr::Named(e) => e.expression.data_type(),
            Expr::SqlCase(e) => e.data_type.clone(),
            Expr::SqlFunction(e) => e.data_type.clone(),
            Expr::SqlExists(_) => DataType::Boolean,
            Expr::SqlLength(_) => DataType::Int32,
            Expr::SqlRowNumber(_) => DataType::Int64,
            Expr::SqlLiteral(e) => e.data_type.clone(),
            Expr::SqlBinaryOperator(e) => e.data_type.clone(),
            Expr::SqlIsNull(_) | Expr::SqlIsNotNull(_) => DataType::Boolean,
            Expr::Aggregation(e) => e.data_type.clone(),
            Expr::SqlCollection(e) => e.data_type.clone(),
        }
    }

    /// Short variant name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Constant(_) => "Constant",
            Expr::Queryable(_) => "Queryable",
            Expr::QuerySourceReference(_) => "QuerySourceReference",
            Expr::SubQuery(_) => "SubQuery",
            Expr::Member(_) => "Member",
            Expr::Binary(_) => "Binary",
            Expr::Unary(_) => "Unary",
            Expr::Conditional(_) => "Conditional",
            Expr::New(_) => "New",
            Expr::Parameter(_) => "Parameter",
            Expr::Lambda(_) => "Lambda",
            Expr::Invocation(_) => "Invocation",
            Expr::SqlTableReference(_) => "SqlTableReference",
            Expr::SqlEntityRefMember(_) => "SqlEntityRefMember",
            Expr::SqlColumn(_) => "SqlColumn",
            Expr::SqlEntity(_) => "SqlEntity",
            Expr::SqlGroupingSelect(_) => "SqlGroupingSelect",
            Expr::SqlConvertedBoolean(_) => "SqlConvertedBoolean",
            Expr::SqlSubStatement(_) => "SqlSubStatement",
            Expr::Named(_) => "Named",
            Expr::SqlCase(_) => "SqlCase",
            Expr::SqlFunction(_) => "SqlFunction",
            Expr::SqlExists(_) => "SqlExists",
            Expr::SqlLength(_) => "SqlLength",
            Expr::SqlRowNumber(_) => "SqlRowNumber",
            Expr::SqlLiteral(_) => "SqlLiteral",
            Expr::SqlBinaryOperator(_) => "SqlBinaryOperator",
            Expr::SqlIsNull(_) => "SqlIsNull",
            Expr::SqlIsNotNull(_) => "SqlIsNotNull",
            Expr::Aggregation(_) => "Aggregation",
            Expr::SqlCollection(_) => "SqlCollection",
        }
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn constant(constant: ConstantExpr) -> Self {
        Expr::Constant(constant)
    }

    pub fn bool_constant(value: bool) -> Self {
        Expr::Constant(ConstantExpr::bool(value))
    }

    pub fn column(column: SqlColumnExpr) -> Self {
        Expr::SqlColumn(column)
    }

    pub fn member(expression: Expr, member_name: impl Into<String>, data_type: DataType) -> Self {
        Expr::Member(MemberExpr {
            expression: Box::new(expression),
            member_name: member_name.into(),
            data_type,
        })
    }

    pub fn query_source_reference(clause: ClauseId, data_type: DataType) -> Self {
        Expr::QuerySourceReference(QuerySourceReferenceExpr { clause, data_type })
    }

    /// Builds a binary node, deriving its result type from the operator and operands.
    pub fn binary(operator: BinaryOperator, left: Expr, right: Expr) -> Self {
        let left_type = left.data_type();
        let right_type = right.data_type();
        let lifted = left_type.is_nullable() || right_type.is_nullable();
        let data_type = if operator.is_comparison() {
            DataType::Boolean
        } else if operator == BinaryOperator::Coalesce {
            right_type
        } else if lifted {
            DataType::nullable(left_type.underlying().clone())
        } else {
            left_type
        };
        Expr::Binary(BinaryExpr {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            data_type,
        })
    }

    pub fn binary_with_type(operator: BinaryOperator, left: Expr, right: Expr, data_type: DataType) -> Self {
        Expr::Binary(BinaryExpr {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            data_type,
        })
    }

    pub fn equal(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOperator::Equal, left, right)
    }

    pub fn not_equal(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOperator::NotEqual, left, right)
    }

    pub fn and_also(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOperator::AndAlso, left, right)
    }

    pub fn or_else(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOperator::OrElse, left, right)
    }

    pub fn coalesce(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOperator::Coalesce, left, right)
    }

    pub fn not(operand: Expr) -> Self {
        let data_type = operand.data_type();
        Expr::Unary(UnaryExpr {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
            data_type,
        })
    }

    pub fn convert(operand: Expr, data_type: DataType) -> Self {
        Expr::Unary(UnaryExpr {
            operator: UnaryOperator::Convert,
            operand: Box::new(operand),
            data_type,
        })
    }

    pub fn conditional(test: Expr, if_true: Expr, if_false: Expr) -> Self {
        let data_type = if_true.data_type();
        Expr::Conditional(ConditionalExpr {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            data_type,
        })
    }

    pub fn is_null(expression: Expr) -> Self {
        Expr::SqlIsNull(SqlIsNullExpr {
            expression: Box::new(expression),
        })
    }

    pub fn is_not_null(expression: Expr) -> Self {
        Expr::SqlIsNotNull(SqlIsNotNullExpr {
            expression: Box::new(expression),
        })
    }

    pub fn aggregation(function: AggregationFunction, expression: Expr, data_type: DataType) -> Self {
        Expr::Aggregation(AggregationExpr {
            function,
            expression: Box::new(expression),
            data_type,
        })
    }

    pub fn sub_statement(statement: SqlStatement) -> Self {
        Expr::SqlSubStatement(SqlSubStatementExpr {
            statement: Box::new(statement),
        })
    }

    /// Combines `conditions` with `AndAlso`, or returns `None` for an empty list.
    pub fn conjunction(conditions: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        conditions
            .into_iter()
            .reduce(|combined, next| Expr::and_also(combined, next))
    }

    pub fn as_converted_boolean(&self) -> Option<&SqlConvertedBooleanExpr> {
        match self {
            Expr::SqlConvertedBoolean(converted) => Some(converted),
            _ => None,
        }
    }

    pub fn is_constant_value(&self, value: &Value) -> bool {
        matches!(self, Expr::Constant(constant) if &constant.value == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_boolean_never_nests() {
        let inner = Expr::column(SqlColumnExpr::new("t0", "IsActive", DataType::Int32, false));
        let once = SqlConvertedBooleanExpr::wrap(inner);
        let twice = SqlConvertedBooleanExpr::wrap(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_converted_boolean_type_follows_nullability() {
        let nullable = Expr::column(SqlColumnExpr::new(
            "t0",
            "Flag",
            DataType::nullable(DataType::Int32),
            false,
        ));
        assert_eq!(
            SqlConvertedBooleanExpr::wrap(nullable).data_type(),
            DataType::nullable(DataType::Boolean)
        );
    }

    #[test]
    fn test_binary_comparison_is_boolean() {
        let expr = Expr::binary(
            BinaryOperator::LessThan,
            Expr::Constant(ConstantExpr::int(1)),
            Expr::Constant(ConstantExpr::int(2)),
        );
        assert_eq!(expr.data_type(), DataType::Boolean);
    }

    #[test]
    fn test_entity_update_retargets_columns_and_changes_identity() {
        let pk = SqlColumnExpr::new("t0", "ID", DataType::Int32, true);
        let name = SqlColumnExpr::new("t0", "Name", DataType::String, false);
        let entity = SqlEntityExpr::new("Customer", "t0", None, pk.clone(), vec![pk, name]);
        let updated = entity.update("q1", Some("c".to_string()));

        assert_ne!(entity.id, updated.id);
        assert_eq!(updated.primary_key_column.table_alias, "q1");
        assert!(updated.columns.iter().all(|column| column.table_alias == "q1"));
        assert_eq!(updated.name.as_deref(), Some("c"));
    }

    #[test]
    fn test_named_arguments_for_new() {
        let new = NewExpr {
            type_name: "Pair".to_string(),
            arguments: vec![Expr::Constant(ConstantExpr::int(1)), Expr::Constant(ConstantExpr::int(2))],
            member_names: vec!["A".to_string(), "B".to_string()],
        };
        let named = NamedExpr::create_new_expression_with_names(new);
        assert!(matches!(&named.arguments[1], Expr::Named(n) if n.name.as_deref() == Some("B")));
    }
}
