use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::data::DataValue;

use super::{ComparisonOperator, LogicalOperator};

/// A node of a filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum FilterExpr {
    Comparison(ComparisonExpr),
    Logical(LogicalExpr),
}

/// Compares a property against a constant or another property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExpr {
    pub operator: ComparisonOperator,
    pub left: Operand,
    /// Absent for unary operators
    pub right: Option<Operand>,
}

/// Combines two filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalExpr {
    pub operator: LogicalOperator,
    pub left: Box<FilterExpr>,
    /// Always present for `And` and `Or`
    pub right: Option<Box<FilterExpr>>,
}

/// A side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum Operand {
    /// A column reference, either `Column` or `Table.Column`
    Property(String),
    Constant(DataValue),
}

impl Operand {
    pub fn property(name: impl Into<String>) -> Self {
        Self::Property(name.into())
    }

    pub fn constant(value: impl Into<DataValue>) -> Self {
        Self::Constant(value.into())
    }

    /// Whether the operand is a null constant
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Constant(DataValue::Null))
    }
}

impl ComparisonExpr {
    pub fn new(operator: ComparisonOperator, left: Operand, right: Option<Operand>) -> Self {
        Self {
            operator,
            left,
            right,
        }
    }
}

impl LogicalExpr {
    pub fn new(operator: LogicalOperator, left: FilterExpr, right: Option<FilterExpr>) -> Self {
        Self {
            operator,
            left: Box::new(left),
            right: right.map(Box::new),
        }
    }
}

impl FilterExpr {
    pub fn compare(operator: ComparisonOperator, left: Operand, right: Option<Operand>) -> Self {
        Self::Comparison(ComparisonExpr::new(operator, left, right))
    }

    /// Shorthand for `property = value`
    pub fn equals(property: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::compare(
            ComparisonOperator::Equal,
            Operand::property(property),
            Some(Operand::constant(value)),
        )
    }

    pub fn and(self, other: FilterExpr) -> Self {
        Self::Logical(LogicalExpr::new(LogicalOperator::And, self, Some(other)))
    }

    pub fn or(self, other: FilterExpr) -> Self {
        Self::Logical(LogicalExpr::new(LogicalOperator::Or, self, Some(other)))
    }

    /// Combines the filters with `And`, returning `None` if there are none
    pub fn all(filters: impl IntoIterator<Item = FilterExpr>) -> Option<Self> {
        filters.into_iter().reduce(|acc, f| acc.and(f))
    }

    /// Returns the depth of the tree, a single comparison has depth 1
    pub fn depth(&self) -> usize {
        match self {
            FilterExpr::Comparison(_) => 1,
            FilterExpr::Logical(l) => {
                1 + l
                    .left
                    .depth()
                    .max(l.right.as_ref().map_or(0, |r| r.depth()))
            }
        }
    }
}
