use super::{SqlStatement, SqlTable};
use crate::expression::{DataType, Expr, Ordering};

/// Mutable staging area for a [`SqlStatement`].
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatementBuilder {
    pub data_type: Option<DataType>,
    pub select_projection: Option<Expr>,
    pub sql_tables: Vec<SqlTable>,
    pub where_condition: Option<Expr>,
    pub group_by_expression: Option<Expr>,
    pub orderings: Vec<Ordering>,
    pub top_expression: Option<Expr>,
    pub is_distinct_query: bool,
    pub row_number_selector: Option<Expr>,
    pub current_row_number_offset: Option<Expr>,
}

impl Default for SqlStatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlStatementBuilder {
    pub fn new() -> Self {
        SqlStatementBuilder {
            data_type: None,
            select_projection: None,
            sql_tables: Vec::new(),
            where_condition: None,
            group_by_expression: None,
            orderings: Vec::new(),
            top_expression: None,
            is_distinct_query: false,
            row_number_selector: None,
            current_row_number_offset: None,
        }
    }

    pub fn from_statement(statement: SqlStatement) -> Self {
        SqlStatementBuilder {
            data_type: Some(statement.data_type),
            select_projection: Some(statement.select_projection),
            sql_tables: statement.sql_tables,
            where_condition: statement.where_condition,
            group_by_expression: statement.group_by_expression,
            orderings: statement.orderings,
            top_expression: statement.top_expression,
            is_distinct_query: statement.is_distinct_query,
            row_number_selector: statement.row_number_selector,
            current_row_number_offset: statement.current_row_number_offset,
        }
    }

    pub fn with_projection(mut self, projection: Expr) -> Self {
        self.select_projection = Some(projection);
        self
    }

    pub fn with_table(mut self, table: SqlTable) -> Self {
        self.sql_tables.push(table);
        self
    }

    pub fn with_where_condition(mut self, condition: Expr) -> Self {
        self.add_where_condition(condition);
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// AND-combines `condition` with the current WHERE condition.
    pub fn add_where_condition(&mut self, condition: Expr) {
        self.where_condition = Some(match self.where_condition.take() {
            Some(existing) => Expr::and_also(existing, condition),
            None => condition,
        });
    }

    /// Data type defaults to a sequence of the projection type.
    pub fn build(self) -> SqlStatement {
        let select_projection = self.select_projection.unwrap_or_else(|| Expr::bool_constant(true));
        let data_type = self
            .data_type
            .unwrap_or_else(|| DataType::sequence(select_projection.data_type()));
        SqlStatement {
            data_type,
            select_projection,
            sql_tables: self.sql_tables,
            where_condition: self.where_condition,
            group_by_expression: self.group_by_expression,
            orderings: self.orderings,
            top_expression: self.top_expression,
            is_distinct_query: self.is_distinct_query,
            row_number_selector: self.row_number_selector,
            current_row_number_offset: self.current_row_number_offset,
        }
    }

    /// Returns the statement built so far and leaves the builder empty.
    pub fn get_statement_and_reset(&mut self) -> SqlStatement {
        std::mem::take(self).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::BinaryOperator;

    #[test]
    fn test_where_conditions_are_and_combined() {
        let mut builder = SqlStatementBuilder::new();
        builder.add_where_condition(Expr::bool_constant(true));
        builder.add_where_condition(Expr::bool_constant(false));
        let statement = builder.build();
        assert!(matches!(
            statement.where_condition,
            Some(Expr::Binary(ref b)) if b.operator == BinaryOperator::AndAlso
        ));
    }

    #[test]
    fn test_get_statement_and_reset() {
        let mut builder = SqlStatementBuilder::new().with_projection(Expr::bool_constant(true));
        builder.is_distinct_query = true;
        let statement = builder.get_statement_and_reset();
        assert!(statement.is_distinct_query);
        assert_eq!(statement.data_type, DataType::sequence(DataType::Boolean));
        assert!(builder.select_projection.is_none());
        assert!(!builder.is_distinct_query);
    }
}
