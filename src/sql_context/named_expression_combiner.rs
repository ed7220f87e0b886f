//! Moves names down onto the values they label, so that naming an already
//! named value never stacks `Named` wrappers.

use crate::{
    expression::{Expr, NamedExpr, NewExpr, SqlConvertedBooleanExpr, UnaryExpr, UnaryOperator},
    mapping::MappingResolutionContext,
};

/// Name of the column produced for `member` of a tuple named `outer`.
fn combine_names(outer: Option<&str>, member: &str) -> String {
    match outer {
        Some(outer) => format!("{}_{}", outer, member),
        None => member.to_string(),
    }
}

pub fn process_names(name: Option<String>, expression: Expr, context: &mut MappingResolutionContext) -> Expr {
    match expression {
        Expr::Named(inner) => process_names(name.or(inner.name), *inner.expression, context),
        Expr::SqlConvertedBoolean(converted) => {
            SqlConvertedBooleanExpr::wrap(process_names(name, *converted.expression, context))
        }
        Expr::New(new) => {
            let arguments = new
                .arguments
                .into_iter()
                .zip(new.member_names.iter())
                .map(|(argument, member)| {
                    process_names(Some(combine_names(name.as_deref(), member)), argument, context)
                })
                .collect();
            Expr::New(NewExpr { arguments, ..new })
        }
        Expr::SqlEntity(entity) if entity.name != name => {
            let table_alias = entity.table_alias.clone();
            Expr::SqlEntity(context.update_entity_and_add_mapping(&entity, &table_alias, name))
        }
        entity @ Expr::SqlEntity(_) => entity,
        Expr::Unary(unary) if unary.operator == UnaryOperator::Convert => Expr::Unary(UnaryExpr {
            operand: Box::new(process_names(name, *unary.operand, context)),
            ..unary
        }),
        other => NamedExpr::wrap(name, other),
    }
}
