//! Unit tests - public API surface exercised from outside the crate

mod config_tests;
mod query_model_tests;
