use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::{DataType, Expr};

/// Post-processing applied to the rows produced by the terminal clause.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResultOperator {
    Count,
    Sum,
    Min,
    Max,
    Average,
    Distinct,
    Take { count: Expr },
    Skip { count: Expr },
    First { return_default_when_empty: bool },
    Single { return_default_when_empty: bool },
    Any,
}

impl ResultOperator {
    /// Output type of the operator given the type of its input sequence.
    pub fn output_type(&self, input: &DataType) -> DataType {
        let element = input.element_type().cloned().unwrap_or_else(|| input.clone());
        match self {
            ResultOperator::Count => DataType::Int32,
            ResultOperator::Average => DataType::Double,
            ResultOperator::Sum | ResultOperator::Min | ResultOperator::Max => element,
            ResultOperator::First { .. } | ResultOperator::Single { .. } => element,
            ResultOperator::Any => DataType::Boolean,
            ResultOperator::Distinct | ResultOperator::Take { .. } | ResultOperator::Skip { .. } => input.clone(),
        }
    }

    pub fn transform_expressions(&mut self, f: &mut dyn FnMut(Expr) -> Expr) {
        if let ResultOperator::Take { count } | ResultOperator::Skip { count } = self {
            let taken = std::mem::replace(count, Expr::bool_constant(false));
            *count = f(taken);
        }
    }
}

impl fmt::Display for ResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultOperator::Count => write!(f, "Count()"),
            ResultOperator::Sum => write!(f, "Sum()"),
            ResultOperator::Min => write!(f, "Min()"),
            ResultOperator::Max => write!(f, "Max()"),
            ResultOperator::Average => write!(f, "Average()"),
            ResultOperator::Distinct => write!(f, "Distinct()"),
            ResultOperator::Take { count } => write!(f, "Take({})", count),
            ResultOperator::Skip { count } => write!(f, "Skip({})", count),
            ResultOperator::First { return_default_when_empty } => {
                write!(f, "{}()", if *return_default_when_empty { "FirstOrDefault" } else { "First" })
            }
            ResultOperator::Single { return_default_when_empty } => {
                write!(f, "{}()", if *return_default_when_empty { "SingleOrDefault" } else { "Single" })
            }
            ResultOperator::Any => write!(f, "Any()"),
        }
    }
}
