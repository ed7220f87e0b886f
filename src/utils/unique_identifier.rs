//! Unique identifier generation.
//!
//! A single [`UniqueIdentifierGenerator`] is shared by everything that invents
//! names during one translation run: table aliases (`t0`, `t1`, ...),
//! sub-statement aliases (`q0`, ...) and query-model item names. Names that
//! were chosen by the caller are registered with
//! [`UniqueIdentifierGenerator::add_known_identifier`] so generated names
//! never collide with them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueIdentifierGenerator {
    known_identifiers: HashSet<String>,
    counter: usize,
}

impl UniqueIdentifierGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier that generated names must avoid.
    pub fn add_known_identifier(&mut self, identifier: &str) {
        self.known_identifiers.insert(identifier.to_string());
    }

    pub fn is_known_identifier(&self, identifier: &str) -> bool {
        self.known_identifiers.contains(identifier)
    }

    /// Returns `prefix` followed by the lowest counter value that produces an
    /// identifier not seen before. The result is registered as known.
    pub fn get_unique_identifier(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{}{}", prefix, self.counter);
            self.counter += 1;
            if self.known_identifiers.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    pub fn reset(&mut self) {
        self.known_identifiers.clear();
        self.counter = 0;
    }
}
