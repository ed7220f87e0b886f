//! Re-expresses the projection of a sub-statement as seen from the
//! enclosing statement: every value becomes a column of the sub-statement's
//! alias, named the way the inner projection names it.

use crate::{
    expression::{
        Expr, NewExpr, SqlColumnExpr, SqlConvertedBooleanExpr, SqlEntityExpr, SqlGroupingSelectExpr,
    },
    mapping::{context::MappingResolutionContext, errors::MappingError},
    sql_statement::TableId,
};

const DEFAULT_COLUMN_NAME: &str = "value";

pub fn resolve_sub_statement_reference(
    projection: &Expr,
    table_alias: &str,
    table: TableId,
    context: &mut MappingResolutionContext,
) -> Result<Expr, MappingError> {
    resolve_named(projection, None, table_alias, table, context)
}

fn resolve_named(
    expr: &Expr,
    name: Option<&str>,
    table_alias: &str,
    table: TableId,
    context: &mut MappingResolutionContext,
) -> Result<Expr, MappingError> {
    match expr {
        Expr::Named(named) => resolve_named(&named.expression, named.name.as_deref(), table_alias, table, context),
        Expr::SqlEntity(entity) => {
            let name = name.or(entity.name.as_deref());
            let reference = create_entity_reference(entity, name, table_alias);
            context.add_sql_entity_mapping(&reference, table);
            Ok(Expr::SqlEntity(reference))
        }
        Expr::New(new) => {
            let arguments = new
                .arguments
                .iter()
                .map(|argument| resolve_named(argument, None, table_alias, table, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::New(NewExpr {
                type_name: new.type_name.clone(),
                arguments,
                member_names: new.member_names.clone(),
            }))
        }
        Expr::SqlGroupingSelect(grouping) => Ok(Expr::SqlGroupingSelect(resolve_grouping(
            grouping,
            table_alias,
            table,
            context,
        )?)),
        Expr::SqlConvertedBoolean(converted) => {
            let inner = resolve_named(&converted.expression, name, table_alias, table, context)?;
            Ok(SqlConvertedBooleanExpr::wrap(inner))
        }
        scalar => Ok(Expr::SqlColumn(SqlColumnExpr::new(
            table_alias,
            name.unwrap_or(DEFAULT_COLUMN_NAME),
            scalar.data_type(),
            false,
        ))),
    }
}

fn resolve_grouping(
    grouping: &SqlGroupingSelectExpr,
    table_alias: &str,
    table: TableId,
    context: &mut MappingResolutionContext,
) -> Result<SqlGroupingSelectExpr, MappingError> {
    let key = resolve_named(&grouping.key_expression, None, table_alias, table, context)?;
    let aggregations = grouping
        .aggregation_expressions
        .iter()
        .map(|aggregation| resolve_named(aggregation, None, table_alias, table, context))
        .collect::<Result<Vec<_>, _>>()?;
    let updated = context.update_grouping_select_and_add_mapping(
        grouping,
        key,
        (*grouping.element_expression).clone(),
        aggregations,
    );
    context.add_group_reference_mapping(&updated, table);
    Ok(updated)
}

/// The entity as visible through `table_alias`. Columns of a named entity are
/// projected as `<name>_<column>`.
fn create_entity_reference(entity: &SqlEntityExpr, name: Option<&str>, table_alias: &str) -> SqlEntityExpr {
    let reference_column = |column: &SqlColumnExpr| SqlColumnExpr {
        table_alias: table_alias.to_string(),
        column_name: match name {
            Some(name) => format!("{}_{}", name, column.column_name),
            None => column.column_name.clone(),
        },
        data_type: column.data_type.clone(),
        is_primary_key: column.is_primary_key,
    };
    SqlEntityExpr::new(
        entity.item_type.clone(),
        table_alias,
        None,
        reference_column(&entity.primary_key_column),
        entity.columns.iter().map(reference_column).collect(),
    )
}
