//! Static types carried by expression nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    DateTime,
    Guid,
    Nullable(Box<DataType>),
    /// A mapped item type, e.g. `Customer`.
    Entity(String),
    Sequence(Box<DataType>),
    Grouping {
        key: Box<DataType>,
        element: Box<DataType>,
    },
    /// A projected tuple or constructed object.
    Object(String),
}

impl DataType {
    pub fn nullable(inner: DataType) -> Self {
        match inner {
            DataType::Nullable(_) => inner,
            other => DataType::Nullable(Box::new(other)),
        }
    }

    pub fn sequence(element: DataType) -> Self {
        DataType::Sequence(Box::new(element))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, DataType::Nullable(_))
    }

    /// The type with any `Nullable` wrapper removed.
    pub fn underlying(&self) -> &DataType {
        match self {
            DataType::Nullable(inner) => inner.underlying(),
            other => other,
        }
    }

    /// `true` for `Boolean` and `Boolean?`.
    pub fn is_boolean(&self) -> bool {
        matches!(self.underlying(), DataType::Boolean)
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.underlying(), DataType::Entity(_))
    }

    /// Integer type used to store a boolean of this type in SQL.
    /// Non-boolean types are returned unchanged.
    pub fn matching_int_type(&self) -> DataType {
        match self {
            DataType::Boolean => DataType::Int32,
            DataType::Nullable(inner) if inner.is_boolean() => DataType::nullable(DataType::Int32),
            DataType::Sequence(inner) => DataType::sequence(inner.matching_int_type()),
            other => other.clone(),
        }
    }

    pub fn make_nullable(&self) -> DataType {
        match self {
            DataType::Entity(_) | DataType::Object(_) | DataType::Sequence(_) => self.clone(),
            DataType::Grouping { .. } | DataType::Nullable(_) => self.clone(),
            other => DataType::nullable(other.clone()),
        }
    }

    /// Element type of a sequence or grouping.
    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Sequence(element) => Some(element),
            DataType::Grouping { element, .. } => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::Double => write!(f, "Double"),
            DataType::Decimal => write!(f, "Decimal"),
            DataType::String => write!(f, "String"),
            DataType::DateTime => write!(f, "DateTime"),
            DataType::Guid => write!(f, "Guid"),
            DataType::Nullable(inner) => write!(f, "{}?", inner),
            DataType::Entity(name) | DataType::Object(name) => write!(f, "{}", name),
            DataType::Sequence(element) => write!(f, "Sequence<{}>", element),
            DataType::Grouping { key, element } => write!(f, "Grouping<{}, {}>", key, element),
        }
    }
}
