//! Mapping resolution: binds prepared item types, members and navigations
//! to tables and columns through a [`MappingResolver`].

pub mod context;
pub mod errors;
mod expression_resolver;
mod member_access;
pub mod resolver;
pub mod schema;
pub mod stage;
pub mod sub_statement_reference;

pub use context::MappingResolutionContext;
pub use errors::{LookupError, MappingError};
pub use expression_resolver::EntityRefUsage;
pub use resolver::MappingResolver;
pub use schema::SchemaMappingResolver;
pub use stage::{MappingResolutionStage, DEFAULT_MAX_JOIN_RESOLUTION_STEPS};
