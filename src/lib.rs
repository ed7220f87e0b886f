//! relmap - relational mapping core for comprehension-style query models
//!
//! This crate turns a clause-based query model into a SQL statement tree
//! ready for text generation:
//! - Query model construction and cloning
//! - Preparation into an unresolved statement
//! - Mapping resolution against a mapping schema (tables, columns, joins)
//! - Value/predicate context rewriting

pub mod utils;

pub mod config;
pub mod expression;
pub mod mapping;
pub mod query_model;
pub mod sql_context;
pub mod sql_preparation;
pub mod sql_statement;
pub mod transformed;
pub mod translation;
