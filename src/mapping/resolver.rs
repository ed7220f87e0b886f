use crate::{
    expression::{Expr, SqlEntityExpr, SqlEntityRefMemberExpr},
    mapping::errors::MappingError,
    sql_statement::{JoinInfo, ResolvedSimpleTableInfo, UnresolvedJoinInfo, UnresolvedTableInfo},
    utils::unique_identifier::UniqueIdentifierGenerator,
};

/// Mapping metadata provider consulted by the resolution stage.
///
/// Implementations are synchronous; any schema loading or caching happens
/// before a resolver is handed to the pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait MappingResolver {
    /// Binds an item type to a physical table under a fresh alias.
    fn resolve_table_info(
        &self,
        table_info: &UnresolvedTableInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> Result<ResolvedSimpleTableInfo, MappingError>;

    /// The entity (all mapped columns) for one row of `table_info`.
    fn resolve_simple_table_info(&self, table_info: &ResolvedSimpleTableInfo) -> Result<SqlEntityExpr, MappingError>;

    /// Resolves one hop of a navigation. May return another unresolved join
    /// when the member is an alias of a different navigation.
    fn resolve_join_info(
        &self,
        join_info: &UnresolvedJoinInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> Result<JoinInfo, MappingError>;

    /// Column, entity reference or other expression for `entity.member_name`.
    fn resolve_member_expression(&self, entity: &SqlEntityExpr, member_name: &str) -> Result<Expr, MappingError>;

    /// The identity of the referenced entity without joining it, if the
    /// foreign key lives on the originating table.
    fn try_resolve_optimized_identity(&self, entity_ref: &SqlEntityRefMemberExpr) -> Option<Expr>;

    /// `entity_ref.member_name` without joining, if that member is the
    /// referenced primary key and the foreign key lives on the originating table.
    fn try_resolve_optimized_member_expression(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        member_name: &str,
    ) -> Option<Expr>;
}
