//! `MappingResolver` backed by a YAML mapping schema.

pub mod config;

use std::{collections::HashMap, path::Path};

use log::{debug, trace};

pub use config::{
    AliasMappingConfig, EntityMappingConfig, MappingSchemaConfig, PropertyMappingConfig, RelationMappingConfig,
    SchemaError,
};

use crate::{
    expression::{DataType, Expr, SqlColumnExpr, SqlEntityExpr, SqlEntityRefMemberExpr},
    mapping::{errors::MappingError, resolver::MappingResolver},
    sql_statement::{JoinInfo, ResolvedJoinInfo, ResolvedSimpleTableInfo, UnresolvedJoinInfo, UnresolvedTableInfo},
    utils::unique_identifier::UniqueIdentifierGenerator,
};

/// What a member name of an entity stands for.
#[derive(Debug, Clone, Copy)]
enum MemberMapping<'a> {
    /// Index into the entity's properties, which is also its column index.
    Property(usize),
    Reference(&'a RelationMappingConfig),
    Collection(&'a RelationMappingConfig),
    Alias(&'a AliasMappingConfig),
}

/// Outcome of following an alias chain.
enum AliasTarget<'a> {
    Member(MemberMapping<'a>),
    /// The chain loops back on itself.
    Cycle,
}

pub struct SchemaMappingResolver {
    config: MappingSchemaConfig,
    entities: HashMap<String, usize>,
}

impl SchemaMappingResolver {
    pub fn new(config: MappingSchemaConfig) -> Result<Self, SchemaError> {
        config.validate_all()?;
        let entities = config
            .entities
            .iter()
            .enumerate()
            .map(|(index, entity)| (entity.item_type.clone(), index))
            .collect();
        debug!(
            "Loaded mapping schema {:?} with {} entities",
            config.name,
            config.entities.len()
        );
        Ok(SchemaMappingResolver { config, entities })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        Self::new(MappingSchemaConfig::from_yaml_str(content)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        Self::new(MappingSchemaConfig::from_yaml_file(path)?)
    }

    pub fn config(&self) -> &MappingSchemaConfig {
        &self.config
    }

    fn entity(&self, item_type: &str) -> Result<&EntityMappingConfig, MappingError> {
        self.entities
            .get(item_type)
            .map(|index| &self.config.entities[*index])
            .ok_or_else(|| MappingError::UnknownTable(item_type.to_string()))
    }

    fn member<'a>(entity: &'a EntityMappingConfig, name: &str) -> Option<MemberMapping<'a>> {
        if let Some(index) = entity.properties.iter().position(|p| p.name == name) {
            return Some(MemberMapping::Property(index));
        }
        if let Some(reference) = entity.references.iter().find(|r| r.name == name) {
            return Some(MemberMapping::Reference(reference));
        }
        if let Some(collection) = entity.collections.iter().find(|c| c.name == name) {
            return Some(MemberMapping::Collection(collection));
        }
        entity
            .aliases
            .iter()
            .find(|a| a.name == name)
            .map(MemberMapping::Alias)
    }

    fn follow_aliases<'a>(entity: &'a EntityMappingConfig, alias: &'a AliasMappingConfig) -> Option<AliasTarget<'a>> {
        let mut current = alias;
        for _ in 0..=entity.aliases.len() {
            match Self::member(entity, &current.alias_of)? {
                MemberMapping::Alias(next) => current = next,
                other => return Some(AliasTarget::Member(other)),
            }
        }
        Some(AliasTarget::Cycle)
    }

    /// Column `index` of `entity`, taken from the entity expression so that
    /// renamed sub-statement columns are honored.
    fn entity_column(entity: &SqlEntityExpr, index: usize) -> Result<SqlColumnExpr, MappingError> {
        entity
            .columns
            .get(index)
            .cloned()
            .ok_or_else(|| MappingError::IncompatibleResolution {
                expected: format!("column #{} of '{}'", index, entity.item_type),
                actual: entity.to_string(),
            })
    }

    fn property_index(entity: &EntityMappingConfig, property: &str) -> Result<usize, MappingError> {
        entity
            .properties
            .iter()
            .position(|p| p.name == property)
            .ok_or_else(|| MappingError::UnknownMember {
                type_name: entity.item_type.clone(),
                member: property.to_string(),
                expression: entity.table.clone(),
            })
    }

    fn primary_key_column(entity: &EntityMappingConfig, table_alias: &str) -> Result<SqlColumnExpr, MappingError> {
        let index = Self::property_index(entity, &entity.primary_key)?;
        let property = &entity.properties[index];
        Ok(SqlColumnExpr::new(table_alias, &property.column, property.column_type(), true))
    }

    /// The relation a member resolves to after following aliases.
    fn reference_for<'a>(&'a self, entity_ref: &SqlEntityRefMemberExpr) -> Option<&'a RelationMappingConfig> {
        let entity = self.entity(&entity_ref.originating_entity.item_type).ok()?;
        match Self::member(entity, &entity_ref.member_name)? {
            MemberMapping::Reference(reference) => Some(reference),
            MemberMapping::Alias(alias) => match Self::follow_aliases(entity, alias)? {
                AliasTarget::Member(MemberMapping::Reference(reference)) => Some(reference),
                _ => None,
            },
            _ => None,
        }
    }

    fn foreign_key_column(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        reference: &RelationMappingConfig,
    ) -> Option<Expr> {
        let entity = self.entity(&entity_ref.originating_entity.item_type).ok()?;
        let index = Self::property_index(entity, &reference.foreign_key).ok()?;
        let column = Self::entity_column(&entity_ref.originating_entity, index).ok()?;
        Some(Expr::column(column))
    }

    fn entity_reference(entity: &SqlEntityExpr, member_name: &str, target: &str) -> Expr {
        Expr::SqlEntityRefMember(SqlEntityRefMemberExpr {
            originating_entity: entity.clone(),
            member_name: member_name.to_string(),
            data_type: DataType::Entity(target.to_string()),
        })
    }
}

impl MappingResolver for SchemaMappingResolver {
    fn resolve_table_info(
        &self,
        table_info: &UnresolvedTableInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> Result<ResolvedSimpleTableInfo, MappingError> {
        let entity = self.entity(&table_info.item_type)?;
        let table_alias = generator.get_unique_identifier("t");
        trace!("Mapped {} to [{}] AS [{}]", entity.item_type, entity.table, table_alias);
        Ok(ResolvedSimpleTableInfo {
            item_type: entity.item_type.clone(),
            table_name: entity.table.clone(),
            table_alias,
        })
    }

    fn resolve_simple_table_info(&self, table_info: &ResolvedSimpleTableInfo) -> Result<SqlEntityExpr, MappingError> {
        let entity = self.entity(&table_info.item_type)?;
        let alias = &table_info.table_alias;
        let columns = entity
            .properties
            .iter()
            .map(|p| SqlColumnExpr::new(alias, &p.column, p.column_type(), p.name == entity.primary_key))
            .collect();
        Ok(SqlEntityExpr::new(
            &entity.item_type,
            alias,
            None,
            Self::primary_key_column(entity, alias)?,
            columns,
        ))
    }

    fn resolve_join_info(
        &self,
        join_info: &UnresolvedJoinInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> Result<JoinInfo, MappingError> {
        let origin = &join_info.originating_entity;
        let entity = self.entity(&origin.item_type)?;
        let unknown = || MappingError::UnknownRelation {
            type_name: origin.item_type.clone(),
            member: join_info.member_name.clone(),
            expression: origin.to_string(),
        };

        match Self::member(entity, &join_info.member_name).ok_or_else(unknown)? {
            MemberMapping::Alias(alias) => {
                trace!("Join {}.{} redirects to {}", origin.item_type, alias.name, alias.alias_of);
                Ok(JoinInfo::Unresolved(UnresolvedJoinInfo {
                    member_name: alias.alias_of.clone(),
                    ..join_info.clone()
                }))
            }
            MemberMapping::Reference(reference) => {
                let target = self.entity(&reference.target)?;
                let foreign_table_info = self.resolve_table_info(
                    &UnresolvedTableInfo {
                        item_type: target.item_type.clone(),
                    },
                    generator,
                )?;
                let left_key = Self::entity_column(origin, Self::property_index(entity, &reference.foreign_key)?)?;
                let right_key = Self::primary_key_column(target, &foreign_table_info.table_alias)?;
                Ok(JoinInfo::Resolved(ResolvedJoinInfo {
                    foreign_table_info,
                    left_key,
                    right_key,
                }))
            }
            MemberMapping::Collection(collection) => {
                let target = self.entity(&collection.target)?;
                let foreign_table_info = self.resolve_table_info(
                    &UnresolvedTableInfo {
                        item_type: target.item_type.clone(),
                    },
                    generator,
                )?;
                let foreign_key = &target.properties[Self::property_index(target, &collection.foreign_key)?];
                let right_key = SqlColumnExpr::new(
                    &foreign_table_info.table_alias,
                    &foreign_key.column,
                    foreign_key.column_type(),
                    false,
                );
                Ok(JoinInfo::Resolved(ResolvedJoinInfo {
                    foreign_table_info,
                    left_key: origin.primary_key_column.clone(),
                    right_key,
                }))
            }
            MemberMapping::Property(_) => Err(unknown()),
        }
    }

    fn resolve_member_expression(&self, entity: &SqlEntityExpr, member_name: &str) -> Result<Expr, MappingError> {
        let mapping = self.entity(&entity.item_type)?;
        let unknown = || MappingError::UnknownMember {
            type_name: entity.item_type.clone(),
            member: member_name.to_string(),
            expression: entity.to_string(),
        };

        let resolved = match Self::member(mapping, member_name).ok_or_else(unknown)? {
            MemberMapping::Alias(alias) => match Self::follow_aliases(mapping, alias).ok_or_else(unknown)? {
                // Relations keep the alias name; join resolution redirects it.
                AliasTarget::Member(MemberMapping::Reference(reference)) => {
                    return Ok(Self::entity_reference(entity, member_name, &reference.target));
                }
                AliasTarget::Cycle => {
                    return Ok(Self::entity_reference(entity, member_name, &entity.item_type));
                }
                AliasTarget::Member(other) => other,
            },
            other => other,
        };

        match resolved {
            MemberMapping::Property(index) => Ok(Expr::column(Self::entity_column(entity, index)?)),
            MemberMapping::Reference(reference) => Ok(Self::entity_reference(entity, member_name, &reference.target)),
            MemberMapping::Collection(collection) => Err(MappingError::UnsupportedMemberAccess {
                member: collection.name.clone(),
                expression: entity.to_string(),
            }),
            MemberMapping::Alias(_) => Err(unknown()),
        }
    }

    fn try_resolve_optimized_identity(&self, entity_ref: &SqlEntityRefMemberExpr) -> Option<Expr> {
        let reference = self.reference_for(entity_ref)?;
        self.foreign_key_column(entity_ref, reference)
    }

    fn try_resolve_optimized_member_expression(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        member_name: &str,
    ) -> Option<Expr> {
        let reference = self.reference_for(entity_ref)?;
        let target = self.entity(&reference.target).ok()?;
        if target.primary_key != member_name {
            return None;
        }
        self.foreign_key_column(entity_ref, reference)
    }
}
