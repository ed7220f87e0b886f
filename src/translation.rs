//! End-to-end pipeline: query model → unresolved statement → resolved
//! statement → context-correct statement.

use log::{debug, info};
use thiserror::Error;

use crate::{
    config::TranslationConfig,
    mapping::{LookupError, MappingError, MappingResolutionContext, MappingResolutionStage, MappingResolver},
    query_model::QueryModel,
    sql_context::{apply_statement_context, SqlContextError, SqlExpressionContext},
    sql_preparation::{prepare_query_model, PreparationError},
    sql_statement::SqlStatement,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error(transparent)]
    Preparation(#[from] PreparationError),

    #[error(transparent)]
    Mapping(MappingError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    SqlContext(#[from] SqlContextError),
}

impl From<MappingError> for TranslationError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::Lookup(lookup) => TranslationError::Lookup(lookup),
            other => TranslationError::Mapping(other),
        }
    }
}

/// The translated statement plus the associations recorded while
/// resolving it.
#[derive(Debug)]
pub struct TranslationResult {
    pub statement: SqlStatement,
    pub context: MappingResolutionContext,
}

pub fn translate_query_model<R: MappingResolver + ?Sized>(
    model: &QueryModel,
    resolver: &R,
    config: &TranslationConfig,
) -> Result<TranslationResult, TranslationError> {
    let mut context = MappingResolutionContext::new(model.identifier_generator().clone());

    let prepared = prepare_query_model(model, context.generator_mut())?;
    if config.log_statements {
        debug!("translate_query_model: prepared {}", prepared);
    }

    let stage = MappingResolutionStage::new(resolver).with_max_join_resolution_steps(config.max_join_resolution_steps);
    let resolved = stage.resolve_sql_statement(prepared, &mut context)?;
    if config.log_statements {
        debug!("translate_query_model: resolved {}", resolved);
    }

    let statement = apply_statement_context(resolved, SqlExpressionContext::ValueRequired, &mut context)?;
    info!("Translated query over {} table(s)", statement.table_count());
    Ok(TranslationResult { statement, context })
}
