use super::{errors::SqlContextError, expression_visitor::SqlContextExpressionVisitor, SqlExpressionContext};
use crate::{
    expression::SqlColumnExpr,
    sql_statement::{
        JoinInfo, ResolvedJoinInfo, SqlJoinedTable, SqlStatement, SqlTable, TableInfo,
    },
};

use SqlExpressionContext::{PredicateRequired, SingleValueRequired, ValueRequired};

impl SqlContextExpressionVisitor<'_> {
    /// Applies the fixed context of every clause position; the projection
    /// gets `selection_context`.
    pub(super) fn apply_to_statement(
        &mut self,
        statement: SqlStatement,
        selection_context: SqlExpressionContext,
    ) -> Result<SqlStatement, SqlContextError> {
        let sql_tables = statement
            .sql_tables
            .into_iter()
            .map(|table| self.apply_to_table(table))
            .collect::<Result<Vec<_>, _>>()?;

        let select_projection = self.apply(statement.select_projection, selection_context)?;
        let where_condition = statement
            .where_condition
            .map(|condition| self.apply(condition, PredicateRequired))
            .transpose()?;
        let group_by_expression = statement
            .group_by_expression
            .map(|group_by| self.apply(group_by, ValueRequired))
            .transpose()?;
        let orderings = self.apply_orderings(statement.orderings)?;
        let top_expression = statement
            .top_expression
            .map(|top| self.apply(top, SingleValueRequired))
            .transpose()?;
        let row_number_selector = statement
            .row_number_selector
            .map(|selector| self.apply(selector, SingleValueRequired))
            .transpose()?;
        let current_row_number_offset = statement
            .current_row_number_offset
            .map(|offset| self.apply(offset, SingleValueRequired))
            .transpose()?;

        Ok(SqlStatement {
            data_type: statement.data_type,
            select_projection,
            sql_tables,
            where_condition,
            group_by_expression,
            orderings,
            top_expression,
            is_distinct_query: statement.is_distinct_query,
            row_number_selector,
            current_row_number_offset,
        })
    }

    fn apply_to_table(&mut self, table: SqlTable) -> Result<SqlTable, SqlContextError> {
        let table_info = match table.table_info {
            TableInfo::SubStatement(mut info) => {
                info.statement = self.apply_to_statement(info.statement, ValueRequired)?;
                TableInfo::SubStatement(info)
            }
            TableInfo::JoinedGrouping(mut info) => {
                info.statement = self.apply_to_statement(info.statement, ValueRequired)?;
                TableInfo::JoinedGrouping(info)
            }
            TableInfo::Join(JoinInfo::Resolved(join)) => TableInfo::Join(JoinInfo::Resolved(ResolvedJoinInfo {
                left_key: join_key(join.left_key),
                right_key: join_key(join.right_key),
                foreign_table_info: join.foreign_table_info,
            })),
            resolved @ TableInfo::Resolved(_) => resolved,
            unresolved @ (TableInfo::Unresolved(_)
            | TableInfo::UnresolvedCollectionJoin(_)
            | TableInfo::UnresolvedGroupReference(_)
            | TableInfo::Join(JoinInfo::Unresolved(_))) => {
                return Err(SqlContextError::unresolved_table(&unresolved));
            }
        };
        let joined_tables = table
            .joined_tables
            .into_iter()
            .map(|joined| {
                Ok(SqlJoinedTable {
                    member_name: joined.member_name,
                    table: self.apply_to_table(joined.table)?,
                })
            })
            .collect::<Result<Vec<_>, SqlContextError>>()?;

        Ok(SqlTable {
            id: table.id,
            table_info,
            join_semantics: table.join_semantics,
            joined_tables,
        })
    }
}

/// Join keys are compared as single values: boolean keys are read as integers.
fn join_key(column: SqlColumnExpr) -> SqlColumnExpr {
    if column.data_type.is_boolean() {
        let int_type = column.data_type.matching_int_type();
        return column.with_data_type(int_type);
    }
    column
}
