//! Expression-level mapping resolution.
//!
//! Entity references (`o.Customer`) are kept unresolved while their
//! consumer is resolved, so member access and identity comparison can skip
//! the join when the foreign key already carries the answer. Whatever is
//! still an entity reference at the top of a resolved expression is joined.

use log::trace;

use super::{
    context::MappingResolutionContext,
    errors::MappingError,
    resolver::MappingResolver,
    stage::MappingResolutionStage,
    sub_statement_reference::resolve_sub_statement_reference,
};
use crate::{
    expression::{BinaryExpr, BinaryOperator, Expr, SqlEntityExpr, SqlEntityRefMemberExpr},
    sql_statement::{JoinCardinality, JoinInfo, ResolvedJoinInfo, TableId, TableInfo, UnresolvedJoinInfo},
};

/// How an entity reference is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRefUsage {
    /// The referenced entity with all of its columns.
    Entity,
    /// Only the identity of the referenced entity, e.g. for `==`.
    Identity,
}

impl<R: MappingResolver + ?Sized> MappingResolutionStage<'_, R> {
    pub fn resolve_expression(&self, expr: Expr, context: &mut MappingResolutionContext) -> Result<Expr, MappingError> {
        match self.resolve_deferred(expr, context)? {
            Expr::SqlEntityRefMember(entity_ref) => {
                self.resolve_entity_ref_member_expression(&entity_ref, EntityRefUsage::Entity, context)
            }
            other => Ok(other),
        }
    }

    /// Resolves `expr` but leaves a top-level entity reference in place.
    pub(super) fn resolve_deferred(&self, expr: Expr, context: &mut MappingResolutionContext) -> Result<Expr, MappingError> {
        match expr {
            Expr::SqlTableReference(reference) => self.resolve_table_reference(reference.table, context),
            Expr::Member(member) => {
                let source = self.resolve_deferred(*member.expression, context)?;
                self.resolve_member_access(source, &member.member_name, context)
            }
            Expr::Binary(binary) if binary.operator.is_equality() => self.resolve_equality(binary, context),
            Expr::SqlIsNull(is_null) => {
                let operand = self.resolve_expression(*is_null.expression, context)?;
                Ok(split_null_check(operand, true))
            }
            Expr::SqlIsNotNull(is_not_null) => {
                let operand = self.resolve_expression(*is_not_null.expression, context)?;
                Ok(split_null_check(operand, false))
            }
            Expr::SqlSubStatement(sub_statement) => {
                Ok(Expr::sub_statement(self.resolve_sql_statement(*sub_statement.statement, context)?))
            }
            entity_ref @ Expr::SqlEntityRefMember(_) => Ok(entity_ref),
            unprepared @ (Expr::QuerySourceReference(_) | Expr::SubQuery(_) | Expr::Queryable(_)) => {
                Err(MappingError::UnpreparedExpression(unprepared.to_string()))
            }
            other => other.try_map_children(&mut |child| self.resolve_expression(child, context)),
        }
    }

    /// Entity for a table of the statement being resolved. Registers the
    /// entity with its table.
    pub(super) fn resolve_table_reference(
        &self,
        table_id: TableId,
        context: &mut MappingResolutionContext,
    ) -> Result<Expr, MappingError> {
        let table = context.get_table(table_id)?;
        match &table.table_info {
            TableInfo::Resolved(info)
            | TableInfo::Join(JoinInfo::Resolved(ResolvedJoinInfo {
                foreign_table_info: info,
                ..
            })) => {
                let info = info.clone();
                let entity = self.resolver.resolve_simple_table_info(&info)?;
                context.add_sql_entity_mapping(&entity, table_id);
                Ok(Expr::SqlEntity(entity))
            }
            TableInfo::SubStatement(info) => {
                let projection = info.statement.select_projection.clone();
                let alias = info.table_alias.clone();
                resolve_sub_statement_reference(&projection, &alias, table_id, context)
            }
            TableInfo::JoinedGrouping(info) => {
                let projection = info.statement.select_projection.clone();
                let alias = info.table_alias.clone();
                resolve_sub_statement_reference(&projection, &alias, table_id, context)
            }
            unresolved => Err(MappingError::UnresolvedTable(unresolved.to_string())),
        }
    }

    /// Resolves an entity reference by left-joining the referenced table to
    /// the table of the originating entity (once per member).
    ///
    /// With [`EntityRefUsage::Identity`] the resolver is asked for the
    /// foreign key column first; only when that is unavailable is the
    /// reference joined, and its primary key column returned.
    pub fn resolve_entity_ref_member_expression(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        usage: EntityRefUsage,
        context: &mut MappingResolutionContext,
    ) -> Result<Expr, MappingError> {
        if usage == EntityRefUsage::Identity {
            if let Some(identity) = self.resolver.try_resolve_optimized_identity(entity_ref) {
                trace!(
                    "MappingResolutionStage: {}.{} resolved to foreign key {}",
                    entity_ref.originating_entity,
                    entity_ref.member_name,
                    identity
                );
                return Ok(identity);
            }
        }

        let entity = self.join_entity_ref_member(entity_ref, context)?;
        Ok(match usage {
            EntityRefUsage::Entity => Expr::SqlEntity(entity),
            EntityRefUsage::Identity => Expr::SqlColumn(entity.primary_key_column),
        })
    }

    pub(super) fn join_entity_ref_member(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        context: &mut MappingResolutionContext,
    ) -> Result<SqlEntityExpr, MappingError> {
        let origin_table = context.get_sql_table_for_entity_expression(&entity_ref.originating_entity)?;
        let join_id = context.get_or_add_left_join(
            origin_table,
            &entity_ref.member_name,
            JoinInfo::Unresolved(UnresolvedJoinInfo {
                originating_entity: entity_ref.originating_entity.clone(),
                member_name: entity_ref.member_name.clone(),
                cardinality: JoinCardinality::One,
            }),
        )?;

        if let TableInfo::Join(join_info) = context.get_table(join_id)?.table_info.clone() {
            if !join_info.is_resolved() {
                let resolved = self.resolve_join_info(join_info, context)?;
                context.set_table_info(join_id, TableInfo::Join(JoinInfo::Resolved(resolved)))?;
            }
        }

        match self.resolve_table_reference(join_id, context)? {
            Expr::SqlEntity(entity) => Ok(entity),
            other => Err(MappingError::IncompatibleResolution {
                expected: "an entity".to_string(),
                actual: other.to_string(),
            }),
        }
    }

    fn resolve_equality(&self, binary: BinaryExpr, context: &mut MappingResolutionContext) -> Result<Expr, MappingError> {
        let operator = binary.operator;
        let left = self.resolve_identity_operand(*binary.left, context)?;
        let right = self.resolve_identity_operand(*binary.right, context)?;

        match (left, right) {
            (Expr::New(left), Expr::New(right)) => {
                let mut comparisons = Vec::with_capacity(left.arguments.len());
                for (member_name, left_argument) in left.member_names.iter().zip(left.arguments.iter()) {
                    let right_argument =
                        right
                            .argument_for(member_name)
                            .ok_or_else(|| MappingError::IncompatibleResolution {
                                expected: format!("member '{}' on both sides of {}", member_name, operator),
                                actual: Expr::New(right.clone()).to_string(),
                            })?;
                    comparisons.push(Expr::binary(operator, left_argument.clone(), right_argument.clone()));
                }
                let combine: fn(Expr, Expr) -> Expr = match operator {
                    BinaryOperator::NotEqual => Expr::or_else,
                    _ => Expr::and_also,
                };
                Ok(comparisons
                    .into_iter()
                    .reduce(combine)
                    .unwrap_or_else(|| Expr::bool_constant(operator == BinaryOperator::Equal)))
            }
            (left, right) => Ok(Expr::binary_with_type(operator, left, right, binary.data_type)),
        }
    }

    fn resolve_identity_operand(&self, expr: Expr, context: &mut MappingResolutionContext) -> Result<Expr, MappingError> {
        match self.resolve_deferred(expr, context)? {
            Expr::SqlEntityRefMember(entity_ref) => {
                self.resolve_entity_ref_member_expression(&entity_ref, EntityRefUsage::Identity, context)
            }
            other => Ok(other),
        }
    }
}

/// `IS NULL` over a tuple holds when every member is NULL; `IS NOT NULL`
/// when any member is not.
fn split_null_check(operand: Expr, is_null: bool) -> Expr {
    match operand {
        Expr::New(new) if !new.arguments.is_empty() => {
            let checks = new.arguments.into_iter().map(|argument| split_null_check(argument, is_null));
            let combined = if is_null {
                checks.reduce(Expr::and_also)
            } else {
                checks.reduce(Expr::or_else)
            };
            combined.unwrap_or_else(|| Expr::bool_constant(is_null))
        }
        Expr::Named(named) => split_null_check(*named.expression, is_null),
        other if is_null => Expr::is_null(other),
        other => Expr::is_not_null(other),
    }
}
