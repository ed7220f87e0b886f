use thiserror::Error;

/// An association was requested from the resolution context that was never
/// registered. Always a pipeline ordering bug, never a user error.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("LookupError: no table registered for entity expression '{0}'")]
    EntityNotMapped(String),

    #[error("LookupError: no group source registered for grouping expression '{0}'")]
    GroupingNotMapped(String),

    #[error("LookupError: table '{0}' is not part of the statement being resolved")]
    TableNotAvailable(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("MappingError: no table is mapped for item type '{0}'")]
    UnknownTable(String),

    #[error("MappingError: member '{member}' of '{type_name}' is not mapped (in '{expression}')")]
    UnknownMember {
        type_name: String,
        member: String,
        expression: String,
    },

    #[error("MappingError: member '{member}' cannot be accessed on '{expression}'")]
    UnsupportedMemberAccess { member: String, expression: String },

    #[error("MappingError: relation '{member}' of '{type_name}' is not mapped (in '{expression}')")]
    UnknownRelation {
        type_name: String,
        member: String,
        expression: String,
    },

    #[error("MappingError: join '{expression}' did not resolve within {limit} resolution steps")]
    JoinResolutionLimitExceeded { expression: String, limit: usize },

    #[error("MappingError: table '{0}' has not been resolved")]
    UnresolvedTable(String),

    #[error("MappingError: expected {expected} but resolution produced '{actual}'")]
    IncompatibleResolution { expected: String, actual: String },

    #[error("MappingError: '{0}' does not reference a grouped sub-statement")]
    InvalidGroupReference(String),

    #[error("MappingError: expression '{0}' must be prepared before mapping resolution")]
    UnpreparedExpression(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}
