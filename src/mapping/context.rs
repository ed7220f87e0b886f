//! Mutable side table for one resolution run.
//!
//! Besides the two association maps (entity → owning table, grouping →
//! referenced group source) the context holds the tables of every statement
//! currently being resolved. Statements check their tables out when
//! resolution of the statement starts and back in when it ends; while a
//! table is checked out, joins discovered anywhere in the run (including
//! nested sub-statements) can be attached to it by id.

use std::collections::HashMap;

use log::trace;

use crate::{
    expression::{Expr, ExprId, SqlEntityExpr, SqlGroupingSelectExpr},
    mapping::errors::LookupError,
    sql_statement::{JoinInfo, JoinSemantics, SqlJoinedTable, SqlTable, TableId, TableInfo},
    utils::unique_identifier::UniqueIdentifierGenerator,
};

#[derive(Debug, Clone)]
struct TableSlot {
    /// The table with `joined_tables` moved out into `joins`.
    table: SqlTable,
    joins: Vec<(String, TableId)>,
}

#[derive(Debug, Clone, Default)]
pub struct MappingResolutionContext {
    entity_mapping: HashMap<ExprId, TableId>,
    group_reference_mapping: HashMap<ExprId, TableId>,
    tables: HashMap<TableId, TableSlot>,
    generator: UniqueIdentifierGenerator,
}

impl MappingResolutionContext {
    pub fn new(generator: UniqueIdentifierGenerator) -> Self {
        MappingResolutionContext {
            generator,
            ..Default::default()
        }
    }

    pub fn generator(&self) -> &UniqueIdentifierGenerator {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut UniqueIdentifierGenerator {
        &mut self.generator
    }

    // ------------------------------------------------------------------
    // Associations
    // ------------------------------------------------------------------

    /// Registers `entity` as coming from `table`. Re-registering the same
    /// identity overwrites the previous table.
    pub fn add_sql_entity_mapping(&mut self, entity: &SqlEntityExpr, table: TableId) {
        self.entity_mapping.insert(entity.id, table);
    }

    pub fn get_sql_table_for_entity_expression(&self, entity: &SqlEntityExpr) -> Result<TableId, LookupError> {
        self.entity_mapping
            .get(&entity.id)
            .copied()
            .ok_or_else(|| LookupError::EntityNotMapped(entity.to_string()))
    }

    pub fn add_group_reference_mapping(&mut self, grouping: &SqlGroupingSelectExpr, table: TableId) {
        self.group_reference_mapping.insert(grouping.id, table);
    }

    pub fn get_referenced_group_source(&self, grouping: &SqlGroupingSelectExpr) -> Result<TableId, LookupError> {
        self.group_reference_mapping
            .get(&grouping.id)
            .copied()
            .ok_or_else(|| LookupError::GroupingNotMapped(Expr::SqlGroupingSelect(grouping.clone()).to_string()))
    }

    /// Revises `entity` (alias and name) and registers the revision under the
    /// table `entity` was registered for, if any.
    pub fn update_entity_and_add_mapping(
        &mut self,
        entity: &SqlEntityExpr,
        table_alias: &str,
        name: Option<String>,
    ) -> SqlEntityExpr {
        let updated = entity.update(table_alias, name);
        if let Some(table) = self.entity_mapping.get(&entity.id).copied() {
            self.entity_mapping.insert(updated.id, table);
        }
        updated
    }

    /// Revises `grouping` with the given parts and registers the revision
    /// under the group source `grouping` was registered for, if any.
    pub fn update_grouping_select_and_add_mapping(
        &mut self,
        grouping: &SqlGroupingSelectExpr,
        key_expression: Expr,
        element_expression: Expr,
        aggregation_expressions: Vec<Expr>,
    ) -> SqlGroupingSelectExpr {
        let updated = grouping.update(key_expression, element_expression, aggregation_expressions);
        if let Some(table) = self.group_reference_mapping.get(&grouping.id).copied() {
            self.group_reference_mapping.insert(updated.id, table);
        }
        updated
    }

    /// Read-only view of the entity → table associations.
    pub fn entity_mappings(&self) -> impl Iterator<Item = (&ExprId, &TableId)> {
        self.entity_mapping.iter()
    }

    /// Read-only view of the grouping → group source associations.
    pub fn group_reference_mappings(&self) -> impl Iterator<Item = (&ExprId, &TableId)> {
        self.group_reference_mapping.iter()
    }

    // ------------------------------------------------------------------
    // Tables of the statements being resolved
    // ------------------------------------------------------------------

    /// Moves `tables` (and their joins) into the context; returns the ids of
    /// the top-level tables in order.
    pub fn check_out_tables(&mut self, tables: Vec<SqlTable>) -> Vec<TableId> {
        tables.into_iter().map(|table| self.check_out_table(table)).collect()
    }

    fn check_out_table(&mut self, mut table: SqlTable) -> TableId {
        let id = table.id;
        let joins = std::mem::take(&mut table.joined_tables)
            .into_iter()
            .map(|joined| (joined.member_name, self.check_out_table(joined.table)))
            .collect();
        self.tables.insert(id, TableSlot { table, joins });
        id
    }

    /// Rebuilds the tables checked out under `ids`, joins included, and
    /// removes them from the context.
    pub fn check_in_tables(&mut self, ids: &[TableId]) -> Result<Vec<SqlTable>, LookupError> {
        ids.iter().map(|id| self.check_in_table(*id)).collect()
    }

    fn check_in_table(&mut self, id: TableId) -> Result<SqlTable, LookupError> {
        let slot = self
            .tables
            .remove(&id)
            .ok_or_else(|| LookupError::TableNotAvailable(id.to_string()))?;
        let mut table = slot.table;
        for (member_name, join_id) in slot.joins {
            table.joined_tables.push(SqlJoinedTable {
                member_name,
                table: self.check_in_table(join_id)?,
            });
        }
        Ok(table)
    }

    pub fn is_checked_out(&self, id: TableId) -> bool {
        self.tables.contains_key(&id)
    }

    /// The table without its joins; see [`joined_table_ids`](Self::joined_table_ids).
    pub fn get_table(&self, id: TableId) -> Result<&SqlTable, LookupError> {
        self.tables
            .get(&id)
            .map(|slot| &slot.table)
            .ok_or_else(|| LookupError::TableNotAvailable(id.to_string()))
    }

    pub fn set_table_info(&mut self, id: TableId, table_info: TableInfo) -> Result<(), LookupError> {
        let slot = self
            .tables
            .get_mut(&id)
            .ok_or_else(|| LookupError::TableNotAvailable(id.to_string()))?;
        slot.table.table_info = table_info;
        Ok(())
    }

    pub fn joined_table_ids(&self, id: TableId) -> Result<Vec<TableId>, LookupError> {
        self.tables
            .get(&id)
            .map(|slot| slot.joins.iter().map(|(_, join_id)| *join_id).collect())
            .ok_or_else(|| LookupError::TableNotAvailable(id.to_string()))
    }

    /// Returns the left join for `member_name` on `table`, adding one with
    /// `join_info` if the member has not been joined yet.
    pub fn get_or_add_left_join(
        &mut self,
        table: TableId,
        member_name: &str,
        join_info: JoinInfo,
    ) -> Result<TableId, LookupError> {
        let slot = self
            .tables
            .get(&table)
            .ok_or_else(|| LookupError::TableNotAvailable(table.to_string()))?;
        if let Some((_, existing)) = slot.joins.iter().find(|(name, _)| name == member_name) {
            return Ok(*existing);
        }

        let joined = SqlTable::new(TableInfo::Join(join_info), JoinSemantics::Left);
        let joined_id = joined.id;
        self.tables.insert(
            joined_id,
            TableSlot {
                table: joined,
                joins: Vec::new(),
            },
        );
        if let Some(slot) = self.tables.get_mut(&table) {
            slot.joins.push((member_name.to_string(), joined_id));
        }
        trace!("MappingResolutionContext: added left join '{}' to table {}", member_name, table);
        Ok(joined_id)
    }
}
