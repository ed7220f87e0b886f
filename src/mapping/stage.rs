//! Statement-level orchestration of mapping resolution.

use log::{debug, trace};

use crate::{
    expression::{DataType, Expr, NamedExpr, Ordering, SqlEntityExpr},
    mapping::{context::MappingResolutionContext, errors::MappingError, resolver::MappingResolver},
    sql_statement::{
        JoinCardinality, JoinInfo, ResolvedJoinInfo, ResolvedJoinedGroupingTableInfo, ResolvedSubStatementTableInfo,
        SqlStatement, SqlStatementBuilder, TableId, TableInfo, UnresolvedGroupReferenceTableInfo, UnresolvedJoinInfo,
    },
};

pub const DEFAULT_MAX_JOIN_RESOLUTION_STEPS: usize = 32;

/// Drives a [`MappingResolver`] over a prepared statement until no
/// unresolved table, join or member node is left.
pub struct MappingResolutionStage<'r, R: MappingResolver + ?Sized> {
    pub(super) resolver: &'r R,
    max_join_resolution_steps: usize,
}

impl<'r, R: MappingResolver + ?Sized> MappingResolutionStage<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        MappingResolutionStage {
            resolver,
            max_join_resolution_steps: DEFAULT_MAX_JOIN_RESOLUTION_STEPS,
        }
    }

    pub fn with_max_join_resolution_steps(mut self, steps: usize) -> Self {
        self.max_join_resolution_steps = steps;
        self
    }

    /// Resolves the tables of `statement` first, then every expression it
    /// holds. Nested statements are resolved recursively while the tables of
    /// the enclosing statements stay available for correlated references.
    pub fn resolve_sql_statement(
        &self,
        statement: SqlStatement,
        context: &mut MappingResolutionContext,
    ) -> Result<SqlStatement, MappingError> {
        let table_ids = context.check_out_tables(statement.sql_tables);
        let resolved = self.resolve_checked_out_statement(
            SqlStatement {
                sql_tables: Vec::new(),
                ..statement
            },
            &table_ids,
            context,
        );
        // tables go back in even when resolution failed half way
        let sql_tables = context.check_in_tables(&table_ids)?;
        let resolved = resolved?;
        Ok(SqlStatement { sql_tables, ..resolved })
    }

    fn resolve_checked_out_statement(
        &self,
        statement: SqlStatement,
        table_ids: &[TableId],
        context: &mut MappingResolutionContext,
    ) -> Result<SqlStatement, MappingError> {
        let mut join_conditions = Vec::new();
        for table_id in table_ids {
            self.resolve_table(*table_id, &mut join_conditions, context)?;
        }

        let select_projection = self.resolve_expression(statement.select_projection, context)?;
        let mut where_condition = self.resolve_optional(statement.where_condition, context)?;
        for condition in join_conditions {
            where_condition = Some(match where_condition {
                Some(existing) => Expr::and_also(existing, condition),
                None => condition,
            });
        }
        let group_by_expression = self.resolve_optional(statement.group_by_expression, context)?;
        let orderings = statement
            .orderings
            .into_iter()
            .map(|ordering| {
                Ok(Ordering {
                    expression: self.resolve_expression(ordering.expression, context)?,
                    direction: ordering.direction,
                })
            })
            .collect::<Result<Vec<_>, MappingError>>()?;
        let top_expression = self.resolve_optional(statement.top_expression, context)?;
        let row_number_selector = self.resolve_optional(statement.row_number_selector, context)?;
        let current_row_number_offset = self.resolve_optional(statement.current_row_number_offset, context)?;

        Ok(SqlStatement {
            data_type: statement.data_type,
            select_projection,
            sql_tables: Vec::new(),
            where_condition,
            group_by_expression,
            orderings,
            top_expression,
            is_distinct_query: statement.is_distinct_query,
            row_number_selector,
            current_row_number_offset,
        })
    }

    fn resolve_optional(
        &self,
        expr: Option<Expr>,
        context: &mut MappingResolutionContext,
    ) -> Result<Option<Expr>, MappingError> {
        expr.map(|e| self.resolve_expression(e, context)).transpose()
    }

    /// Resolves the table info of a checked-out table and of its joins.
    /// Collection joins contribute their key equality to `join_conditions`.
    fn resolve_table(
        &self,
        table_id: TableId,
        join_conditions: &mut Vec<Expr>,
        context: &mut MappingResolutionContext,
    ) -> Result<(), MappingError> {
        let table_info = context.get_table(table_id)?.table_info.clone();
        let resolved = match table_info {
            TableInfo::Unresolved(info) => {
                let resolved = self.resolver.resolve_table_info(&info, context.generator_mut())?;
                trace!(
                    "MappingResolutionStage: {} -> [{}] [{}]",
                    info.item_type,
                    resolved.table_name,
                    resolved.table_alias
                );
                TableInfo::Resolved(resolved)
            }
            TableInfo::UnresolvedCollectionJoin(info) => {
                let source = self.resolve_expression(info.source, context)?;
                let originating_entity = expect_entity(source)?;
                let join = self.resolve_join_info(
                    JoinInfo::Unresolved(UnresolvedJoinInfo {
                        originating_entity,
                        member_name: info.member_name,
                        cardinality: JoinCardinality::Many,
                    }),
                    context,
                )?;
                join_conditions.push(Expr::equal(
                    Expr::column(join.left_key.clone()),
                    Expr::column(join.right_key.clone()),
                ));
                TableInfo::Resolved(join.foreign_table_info)
            }
            TableInfo::UnresolvedGroupReference(info) => {
                TableInfo::JoinedGrouping(self.resolve_group_reference(info, context)?)
            }
            TableInfo::Join(join_info) => TableInfo::Join(JoinInfo::Resolved(self.resolve_join_info(join_info, context)?)),
            TableInfo::SubStatement(info) => TableInfo::SubStatement(ResolvedSubStatementTableInfo {
                statement: self.resolve_sql_statement(info.statement, context)?,
                table_alias: info.table_alias,
            }),
            resolved @ (TableInfo::Resolved(_) | TableInfo::JoinedGrouping(_)) => resolved,
        };
        context.set_table_info(table_id, resolved)?;

        for joined_id in context.joined_table_ids(table_id)? {
            self.resolve_table(joined_id, join_conditions, context)?;
        }
        Ok(())
    }

    /// Re-submits the join to the resolver until it comes back resolved.
    ///
    /// A chain of N hops takes exactly N resolver calls. More than
    /// `max_join_resolution_steps` calls is reported as a mapping error.
    pub fn resolve_join_info(
        &self,
        join_info: JoinInfo,
        context: &mut MappingResolutionContext,
    ) -> Result<ResolvedJoinInfo, MappingError> {
        let mut current = join_info;
        let mut steps = 0;
        loop {
            match current {
                JoinInfo::Resolved(resolved) => return Ok(resolved),
                JoinInfo::Unresolved(unresolved) => {
                    if steps >= self.max_join_resolution_steps {
                        return Err(MappingError::JoinResolutionLimitExceeded {
                            expression: format!("{}.{}", unresolved.originating_entity, unresolved.member_name),
                            limit: self.max_join_resolution_steps,
                        });
                    }
                    steps += 1;
                    trace!(
                        "MappingResolutionStage: join step {} for {}.{}",
                        steps,
                        unresolved.originating_entity.item_type,
                        unresolved.member_name
                    );
                    current = self.resolver.resolve_join_info(&unresolved, context.generator_mut())?;
                }
            }
        }
    }

    /// Builds the element statement for `from x in g` where `g` is a
    /// grouping: the grouped statement without its GROUP BY, projecting the
    /// grouping's element, restricted to rows whose key matches `g.Key`.
    fn resolve_group_reference(
        &self,
        info: UnresolvedGroupReferenceTableInfo,
        context: &mut MappingResolutionContext,
    ) -> Result<ResolvedJoinedGroupingTableInfo, MappingError> {
        let referenced = self.resolve_expression(info.referenced_group_source, context)?;
        let Expr::SqlGroupingSelect(outer_grouping) = referenced else {
            return Err(MappingError::InvalidGroupReference(referenced.to_string()));
        };
        let source_table_id = context.get_referenced_group_source(&outer_grouping)?;
        let TableInfo::SubStatement(source) = &context.get_table(source_table_id)?.table_info else {
            return Err(MappingError::InvalidGroupReference(outer_grouping.key_expression.to_string()));
        };
        let Expr::SqlGroupingSelect(inner_grouping) = source.statement.select_projection.clone() else {
            return Err(MappingError::InvalidGroupReference(source.statement.to_string()));
        };
        let source_alias = source.table_alias.clone();
        let mut builder = SqlStatementBuilder::from_statement(source.statement.clone());

        let inner_key = strip_names(*inner_grouping.key_expression.clone());
        let outer_key = strip_names(*outer_grouping.key_expression.clone());
        let key_match = Expr::or_else(
            Expr::and_also(Expr::is_null(inner_key.clone()), Expr::is_null(outer_key.clone())),
            Expr::and_also(
                Expr::and_also(Expr::is_not_null(inner_key.clone()), Expr::is_not_null(outer_key.clone())),
                Expr::equal(inner_key, outer_key),
            ),
        );
        let key_match = self.resolve_expression(key_match, context)?;

        let element = (*inner_grouping.element_expression).clone();
        builder.group_by_expression = None;
        builder.add_where_condition(key_match);
        builder.data_type = Some(DataType::sequence(element.data_type()));
        builder.select_projection = Some(element);

        let table_alias = context.generator_mut().get_unique_identifier("q");
        debug!(
            "MappingResolutionStage: group reference over [{}] resolved as [{}]",
            source_alias, table_alias
        );
        Ok(ResolvedJoinedGroupingTableInfo {
            table_alias,
            statement: builder.build(),
            associated_grouping_select: inner_grouping,
            grouping_source_table_alias: source_alias,
        })
    }
}

pub(super) fn expect_entity(expr: Expr) -> Result<SqlEntityExpr, MappingError> {
    match expr {
        Expr::SqlEntity(entity) => Ok(entity),
        Expr::Named(named) => expect_entity(*named.expression),
        other => Err(MappingError::IncompatibleResolution {
            expected: "an entity".to_string(),
            actual: other.to_string(),
        }),
    }
}

/// Removes `Named` wrappers, also from the arguments of a `New`.
pub(super) fn strip_names(expr: Expr) -> Expr {
    match expr {
        Expr::Named(NamedExpr { expression, .. }) => strip_names(*expression),
        Expr::New(mut new) => {
            new.arguments = new.arguments.into_iter().map(strip_names).collect();
            Expr::New(new)
        }
        other => other,
    }
}
