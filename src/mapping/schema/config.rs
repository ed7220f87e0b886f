//! YAML mapping schema.
//!
//! ```yaml
//! name: shop
//! entities:
//!   - type: Customer
//!     table: Customers
//!     primary_key: ID
//!     properties:
//!       - { name: ID, column: CustomerID, type: Int32 }
//!       - { name: Name, column: Name, type: String, nullable: true }
//!     references:                     # many-to-one, key on this table
//!       - { name: Region, target: Region, foreign_key: RegionID }
//!     collections:                    # one-to-many, key on the target
//!       - { name: Orders, target: Order, foreign_key: CustomerID }
//!     aliases:                        # member redirecting to another member
//!       - { name: HomeRegion, alias_of: Region }
//! ```
//!
//! `foreign_key` always names a *property*: of this entity for references,
//! of the target entity for collections.

use std::{collections::HashSet, path::Path};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::expression::DataType;

lazy_static! {
    static ref IDENTIFIER_REGEX: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Schema validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Entity '{0}' is mapped more than once")]
    DuplicateEntity(String),

    #[error("Entity '{entity}': member '{member}' is declared more than once")]
    DuplicateMember { entity: String, member: String },

    #[error("Entity '{entity}': primary key '{primary_key}' is not a mapped property")]
    MissingPrimaryKey { entity: String, primary_key: String },

    #[error("Entity '{entity}': relation '{relation}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("Entity '{entity}': foreign key '{foreign_key}' of relation '{relation}' is not a property of '{owner}'")]
    UnknownForeignKey {
        entity: String,
        relation: String,
        foreign_key: String,
        owner: String,
    },

    #[error("Entity '{entity}': alias '{alias}' points at unknown member '{target}'")]
    UnknownAliasTarget {
        entity: String,
        alias: String,
        target: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MappingSchemaConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "at least one entity must be mapped"))]
    #[validate(nested)]
    pub entities: Vec<EntityMappingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EntityMappingConfig {
    #[serde(rename = "type")]
    #[validate(regex(path = *IDENTIFIER_REGEX, message = "entity type must be an identifier"))]
    pub item_type: String,

    #[validate(regex(path = *IDENTIFIER_REGEX, message = "table name must be an identifier"))]
    pub table: String,

    /// Name of the property holding the primary key.
    pub primary_key: String,

    #[validate(length(min = 1, message = "an entity needs at least one property"))]
    #[validate(nested)]
    pub properties: Vec<PropertyMappingConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub references: Vec<RelationMappingConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub collections: Vec<RelationMappingConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub aliases: Vec<AliasMappingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PropertyMappingConfig {
    #[validate(regex(path = *IDENTIFIER_REGEX, message = "property name must be an identifier"))]
    pub name: String,

    #[validate(regex(path = *IDENTIFIER_REGEX, message = "column name must be an identifier"))]
    pub column: String,

    #[serde(rename = "type")]
    pub data_type: DataType,

    #[serde(default)]
    pub nullable: bool,
}

impl PropertyMappingConfig {
    pub fn column_type(&self) -> DataType {
        if self.nullable {
            self.data_type.make_nullable()
        } else {
            self.data_type.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RelationMappingConfig {
    #[validate(regex(path = *IDENTIFIER_REGEX, message = "relation name must be an identifier"))]
    pub name: String,

    pub target: String,

    pub foreign_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AliasMappingConfig {
    #[validate(regex(path = *IDENTIFIER_REGEX, message = "alias name must be an identifier"))]
    pub name: String,

    pub alias_of: String,
}

impl EntityMappingConfig {
    pub fn property(&self, name: &str) -> Option<&PropertyMappingConfig> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn member_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.references.iter().map(|r| r.name.as_str()))
            .chain(self.collections.iter().map(|c| c.name.as_str()))
            .chain(self.aliases.iter().map(|a| a.name.as_str()))
    }
}

impl MappingSchemaConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate_all()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Field-level validation plus the cross-entity checks.
    pub fn validate_all(&self) -> Result<(), SchemaError> {
        self.validate()?;

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.item_type.as_str()) {
                return Err(SchemaError::DuplicateEntity(entity.item_type.clone()));
            }
        }

        for entity in &self.entities {
            let mut members = HashSet::new();
            for member in entity.member_names() {
                if !members.insert(member) {
                    return Err(SchemaError::DuplicateMember {
                        entity: entity.item_type.clone(),
                        member: member.to_string(),
                    });
                }
            }

            if entity.property(&entity.primary_key).is_none() {
                return Err(SchemaError::MissingPrimaryKey {
                    entity: entity.item_type.clone(),
                    primary_key: entity.primary_key.clone(),
                });
            }

            for reference in &entity.references {
                self.check_target(entity, reference)?;
                if entity.property(&reference.foreign_key).is_none() {
                    return Err(SchemaError::UnknownForeignKey {
                        entity: entity.item_type.clone(),
                        relation: reference.name.clone(),
                        foreign_key: reference.foreign_key.clone(),
                        owner: entity.item_type.clone(),
                    });
                }
            }

            for collection in &entity.collections {
                let target = self.check_target(entity, collection)?;
                if target.property(&collection.foreign_key).is_none() {
                    return Err(SchemaError::UnknownForeignKey {
                        entity: entity.item_type.clone(),
                        relation: collection.name.clone(),
                        foreign_key: collection.foreign_key.clone(),
                        owner: target.item_type.clone(),
                    });
                }
            }

            for alias in &entity.aliases {
                if !members.contains(alias.alias_of.as_str()) {
                    return Err(SchemaError::UnknownAliasTarget {
                        entity: entity.item_type.clone(),
                        alias: alias.name.clone(),
                        target: alias.alias_of.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_target(
        &self,
        entity: &EntityMappingConfig,
        relation: &RelationMappingConfig,
    ) -> Result<&EntityMappingConfig, SchemaError> {
        self.entities
            .iter()
            .find(|candidate| candidate.item_type == relation.target)
            .ok_or_else(|| SchemaError::UnknownTarget {
                entity: entity.item_type.clone(),
                relation: relation.name.clone(),
                target: relation.target.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHOP: &str = r#"
name: shop
entities:
  - type: Customer
    table: Customers
    primary_key: ID
    properties:
      - { name: ID, column: CustomerID, type: Int32 }
      - { name: Name, column: Name, type: String, nullable: true }
    collections:
      - { name: Orders, target: Order, foreign_key: CustomerID }
  - type: Order
    table: Orders
    primary_key: ID
    properties:
      - { name: ID, column: OrderID, type: Int32 }
      - { name: CustomerID, column: CustomerID, type: Int32 }
    references:
      - { name: Customer, target: Customer, foreign_key: CustomerID }
    aliases:
      - { name: Buyer, alias_of: Customer }
"#;

    #[test]
    fn test_parse_valid_schema() {
        let config = MappingSchemaConfig::from_yaml_str(SHOP).unwrap();
        assert_eq!(config.name.as_deref(), Some("shop"));
        assert_eq!(config.entities.len(), 2);
        let name = config.entities[0].property("Name").unwrap();
        assert_eq!(name.column_type(), DataType::nullable(DataType::String));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SHOP.as_bytes()).unwrap();
        let config = MappingSchemaConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.entities[1].item_type, "Order");
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        let yaml = SHOP.replace("table: Customers", "table: \"Cust omers\"");
        assert!(matches!(
            MappingSchemaConfig::from_yaml_str(&yaml),
            Err(SchemaError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_reference_target_is_rejected() {
        let yaml = SHOP.replace("target: Customer,", "target: Client,");
        assert!(matches!(
            MappingSchemaConfig::from_yaml_str(&yaml),
            Err(SchemaError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_missing_primary_key_is_rejected() {
        let yaml = SHOP.replacen("primary_key: ID", "primary_key: Id", 1);
        assert!(matches!(
            MappingSchemaConfig::from_yaml_str(&yaml),
            Err(SchemaError::MissingPrimaryKey { .. })
        ));
    }

    #[test]
    fn test_unknown_alias_target_is_rejected() {
        let yaml = SHOP.replace("alias_of: Customer", "alias_of: Client");
        assert!(matches!(
            MappingSchemaConfig::from_yaml_str(&yaml),
            Err(SchemaError::UnknownAliasTarget { .. })
        ));
    }
}
