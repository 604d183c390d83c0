use crate::expression::{Family, NodeKind};
use crate::operators::LogicalOperator;
use camlkit_binding::BindingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Cannot apply {op} to {left} and {}", describe_operand(.right))]
    InvalidJoin {
        op: LogicalOperator,
        left: NodeKind,
        right: Option<NodeKind>,
    },

    #[error("Rewriter produced a {actual} node where a {expected} node was expected")]
    IncompatibleReplacement { expected: Family, actual: NodeKind },

    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl ExprError {
    pub fn invalid_join(op: impl Into<LogicalOperator>, left: NodeKind, right: NodeKind) -> Self {
        Self::InvalidJoin {
            op: op.into(),
            left,
            right: Some(right),
        }
    }

    pub fn invalid_not(kind: NodeKind) -> Self {
        Self::InvalidJoin {
            op: LogicalOperator::Not,
            left: kind,
            right: None,
        }
    }
}

fn describe_operand(kind: &Option<NodeKind>) -> String {
    match kind {
        Some(kind) => kind.to_string(),
        None => "nothing".to_string(),
    }
}
