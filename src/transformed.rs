//! Change tracking for tree rewrites.
//!
//! Rewrite passes hand back either the node they were given (`No`) or a new
//! node (`Yes`). Callers use the flag to rebuild a parent only when one of its
//! children actually changed.

#[derive(Debug, Clone, PartialEq)]
pub enum Transformed<T> {
    Yes(T),
    No(T),
}

impl<T> Transformed<T> {
    pub fn is_yes(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Transformed::Yes(value) | Transformed::No(value) => value,
        }
    }
}
