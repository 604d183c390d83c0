//! Comparison and logical operators, with their markup tag names and inverses.

use std::fmt;

/// Operators that take a field and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    IsNull,
    IsNotNull,
    Membership(MembershipKind),
}

/// The `Type` attribute of a `<Membership>` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipKind {
    CurrentUserGroups,
    WebAllUsers,
    WebGroups,
    WebUsers,
}

impl MembershipKind {
    const ALL: [MembershipKind; 4] = [
        MembershipKind::CurrentUserGroups,
        MembershipKind::WebAllUsers,
        MembershipKind::WebGroups,
        MembershipKind::WebUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipKind::CurrentUserGroups => "CurrentUserGroups",
            MembershipKind::WebAllUsers => "SPWeb.AllUsers",
            MembershipKind::WebGroups => "SPWeb.Groups",
            MembershipKind::WebUsers => "SPWeb.Users",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Operators that compare a field against one or more bound values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Eq,
    Neq,
    Gt,
    Geq,
    Lt,
    Leq,
    BeginsWith,
    Contains,
    In,
    Includes,
    NotIncludes,
}

/// How a binary operator consumes its bound values when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueForm {
    /// Exactly one value.
    Scalar,
    /// Any number of values inside a single `<Values>` element.
    List,
    /// One comparison per value, chained under the given join.
    Expanded(JoinOperator),
}

impl BinaryOperator {
    const ALL: [BinaryOperator; 11] = [
        BinaryOperator::Eq,
        BinaryOperator::Neq,
        BinaryOperator::Gt,
        BinaryOperator::Geq,
        BinaryOperator::Lt,
        BinaryOperator::Leq,
        BinaryOperator::BeginsWith,
        BinaryOperator::Contains,
        BinaryOperator::In,
        BinaryOperator::Includes,
        BinaryOperator::NotIncludes,
    ];

    pub fn tag_name(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "Eq",
            BinaryOperator::Neq => "Neq",
            BinaryOperator::Gt => "Gt",
            BinaryOperator::Geq => "Geq",
            BinaryOperator::Lt => "Lt",
            BinaryOperator::Leq => "Leq",
            BinaryOperator::BeginsWith => "BeginsWith",
            BinaryOperator::Contains => "Contains",
            BinaryOperator::In => "In",
            BinaryOperator::Includes => "Includes",
            BinaryOperator::NotIncludes => "NotIncludes",
        }
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag_name() == name)
    }

    /// The closed-form negation, where one exists.
    pub fn inverse(&self) -> Option<Self> {
        match self {
            BinaryOperator::Eq => Some(BinaryOperator::Neq),
            BinaryOperator::Neq => Some(BinaryOperator::Eq),
            BinaryOperator::Gt => Some(BinaryOperator::Leq),
            BinaryOperator::Leq => Some(BinaryOperator::Gt),
            BinaryOperator::Lt => Some(BinaryOperator::Geq),
            BinaryOperator::Geq => Some(BinaryOperator::Lt),
            BinaryOperator::Includes => Some(BinaryOperator::NotIncludes),
            BinaryOperator::NotIncludes => Some(BinaryOperator::Includes),
            BinaryOperator::BeginsWith | BinaryOperator::Contains | BinaryOperator::In => None,
        }
    }

    pub fn value_form(&self) -> ValueForm {
        match self {
            BinaryOperator::In | BinaryOperator::Includes => ValueForm::List,
            BinaryOperator::BeginsWith | BinaryOperator::Contains => {
                ValueForm::Expanded(JoinOperator::Or)
            }
            BinaryOperator::NotIncludes => ValueForm::Expanded(JoinOperator::And),
            _ => ValueForm::Scalar,
        }
    }
}

impl UnaryOperator {
    pub fn tag_name(&self) -> &'static str {
        match self {
            UnaryOperator::IsNull => "IsNull",
            UnaryOperator::IsNotNull => "IsNotNull",
            UnaryOperator::Membership(_) => "Membership",
        }
    }

    /// Resolves a unary tag; `Membership` needs its `Type` attribute.
    pub fn from_tag_name(name: &str, membership: Option<&str>) -> Option<Self> {
        match name {
            "IsNull" => Some(UnaryOperator::IsNull),
            "IsNotNull" => Some(UnaryOperator::IsNotNull),
            "Membership" => membership
                .and_then(MembershipKind::from_name)
                .map(UnaryOperator::Membership),
            _ => None,
        }
    }

    pub fn inverse(&self) -> Option<Self> {
        match self {
            UnaryOperator::IsNull => Some(UnaryOperator::IsNotNull),
            UnaryOperator::IsNotNull => Some(UnaryOperator::IsNull),
            UnaryOperator::Membership(_) => None,
        }
    }
}

/// The two binary logical operators used to join predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinOperator {
    And,
    Or,
}

impl JoinOperator {
    pub fn tag_name(&self) -> &'static str {
        match self {
            JoinOperator::And => "And",
            JoinOperator::Or => "Or",
        }
    }

    /// The dual operator under De Morgan's laws.
    pub fn dual(&self) -> Self {
        match self {
            JoinOperator::And => JoinOperator::Or,
            JoinOperator::Or => JoinOperator::And,
        }
    }
}

/// Any logical operator, as reported in join failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl From<JoinOperator> for LogicalOperator {
    fn from(op: JoinOperator) -> Self {
        match op {
            JoinOperator::And => LogicalOperator::And,
            JoinOperator::Or => LogicalOperator::Or,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        })
    }
}
