use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryModelError {
    #[error("StructuralError: query model already has a main from clause '{existing}', cannot add '{added}'")]
    DuplicateMainFromClause { existing: String, added: String },

    #[error("StructuralError: query model already has a terminal clause, cannot add a second one")]
    DuplicateTerminalClause,

    #[error("StructuralError: query model has no main from clause")]
    MissingMainFromClause,

    #[error("StructuralError: query model has no select or group clause")]
    MissingTerminalClause,
}
