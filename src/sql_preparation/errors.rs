use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PreparationError {
    #[error("PreparationError: from expression '{0}' is not supported")]
    UnsupportedFromExpression(String),

    #[error("PreparationError: item type '{0}' of a from clause is not an entity")]
    NonEntityItemType(String),

    #[error("PreparationError: reference to unknown query source '{0}'")]
    UnmappedQuerySource(String),

    #[error("PreparationError: result operator '{operator}' cannot be applied to '{input}'")]
    UnsupportedResultOperator { operator: String, input: String },
}
