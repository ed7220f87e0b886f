use log::trace;

use super::{
    context::MappingResolutionContext, errors::MappingError, resolver::MappingResolver,
    stage::{strip_names, MappingResolutionStage},
};
use crate::expression::{DataType, Expr, SqlLengthExpr, UnaryOperator};

impl<R: MappingResolver + ?Sized> MappingResolutionStage<'_, R> {
    /// Resolves `source.member_name` where `source` is already resolved
    /// (entity references still deferred).
    pub(super) fn resolve_member_access(
        &self,
        source: Expr,
        member_name: &str,
        context: &mut MappingResolutionContext,
    ) -> Result<Expr, MappingError> {
        match source {
            Expr::SqlEntity(entity) => self.resolver.resolve_member_expression(&entity, member_name),
            Expr::SqlEntityRefMember(entity_ref) => {
                if let Some(optimized) = self
                    .resolver
                    .try_resolve_optimized_member_expression(&entity_ref, member_name)
                {
                    trace!(
                        "MappingResolutionStage: {}.{}.{} read from the foreign key",
                        entity_ref.originating_entity,
                        entity_ref.member_name,
                        member_name
                    );
                    return Ok(optimized);
                }
                let entity = self.join_entity_ref_member(&entity_ref, context)?;
                self.resolve_member_access(Expr::SqlEntity(entity), member_name, context)
            }
            Expr::New(new) => match new.argument_for(member_name).cloned() {
                Some(argument) => Ok(strip_names(argument)),
                None => Err(MappingError::UnknownMember {
                    type_name: new.type_name.clone(),
                    member: member_name.to_string(),
                    expression: Expr::New(new).to_string(),
                }),
            },
            Expr::Named(named) => self.resolve_member_access(*named.expression, member_name, context),
            Expr::Unary(unary) if unary.operator == UnaryOperator::Convert => {
                self.resolve_member_access(*unary.operand, member_name, context)
            }
            Expr::SqlGroupingSelect(grouping) if member_name == "Key" => Ok(strip_names(*grouping.key_expression)),
            string if member_name == "Length" && string.data_type().underlying() == &DataType::String => {
                Ok(Expr::SqlLength(SqlLengthExpr {
                    expression: Box::new(string),
                }))
            }
            other => Err(MappingError::UnsupportedMemberAccess {
                member: member_name.to_string(),
                expression: other.to_string(),
            }),
        }
    }
}
