//! Integration tests - the whole translation pipeline against a YAML mapping schema
//!
//! These tests drive query models through preparation, mapping resolution and
//! context rewriting without any database.

mod schema_file_tests;
mod translation_tests;
