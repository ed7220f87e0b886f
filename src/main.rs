use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use serde::Deserialize;

use relmap::{
    config::TranslationConfig,
    expression::DataType,
    mapping::SchemaMappingResolver,
    query_model::{Clause, QueryModelBuilder, ResultOperator},
    translation::translate_query_model,
};

/// relmap - translates a query model into a resolved SQL statement tree
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Mapping schema (YAML)
    #[arg(long)]
    mapping: PathBuf,

    /// Query model as a JSON clause list
    #[arg(long)]
    query: PathBuf,

    /// Translation configuration (YAML); read from the environment when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resolver calls allowed per navigation before it is reported as cyclic
    #[arg(long)]
    max_join_resolution_steps: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// On-disk form of a query model.
#[derive(Deserialize)]
struct QueryDocument {
    clauses: Vec<Clause>,
    #[serde(default)]
    result_operators: Vec<ResultOperator>,
    result_type: DataType,
}

fn main() -> anyhow::Result<()> {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TranslationConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => TranslationConfig::from_env()?,
    };
    if let Some(steps) = cli.max_join_resolution_steps {
        config = config.with_max_join_resolution_steps(steps)?;
    }

    let resolver = SchemaMappingResolver::from_yaml_file(&cli.mapping)
        .with_context(|| format!("loading mapping schema {}", cli.mapping.display()))?;

    let content = std::fs::read_to_string(&cli.query)
        .with_context(|| format!("reading query model {}", cli.query.display()))?;
    let document: QueryDocument = serde_json::from_str(&content)?;

    let mut builder = QueryModelBuilder::new();
    for clause in document.clauses {
        builder.add_clause(clause)?;
    }
    for operator in document.result_operators {
        builder.add_result_operator(operator);
    }
    let model = builder.build(document.result_type)?;
    info!("Translating {}", model);

    let result = translate_query_model(&model, &resolver, &config)?;
    info!("{}", result.statement);

    let output = if cli.pretty {
        serde_json::to_string_pretty(&result.statement)?
    } else {
        serde_json::to_string(&result.statement)?
    };
    println!("{}", output);
    Ok(())
}
