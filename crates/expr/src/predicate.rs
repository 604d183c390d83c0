//! Filter predicates: comparisons and the logical joins between them.

use crate::field::{FieldName, FieldRef};
use crate::operators::{BinaryOperator, JoinOperator, LogicalOperator, UnaryOperator};
use camlkit_binding::{BindingError, ParameterBinding, ParameterSource};

/// The column every item carries and that is never null.
pub const ID_FIELD: &str = "ID";

/// A single field comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Unary {
        op: UnaryOperator,
        field: FieldRef,
    },
    Binary {
        op: BinaryOperator,
        field: FieldRef,
        value: ParameterBinding,
    },
}

impl Comparison {
    pub fn unary(op: UnaryOperator, field: impl Into<FieldRef>) -> Self {
        Comparison::Unary {
            op,
            field: field.into(),
        }
    }

    pub fn binary(
        op: BinaryOperator,
        field: impl Into<FieldRef>,
        value: impl Into<ParameterBinding>,
    ) -> Self {
        Comparison::Binary {
            op,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &FieldRef {
        match self {
            Comparison::Unary { field, .. } | Comparison::Binary { field, .. } => field,
        }
    }

    pub fn value(&self) -> Option<&ParameterBinding> {
        match self {
            Comparison::Unary { .. } => None,
            Comparison::Binary { value, .. } => Some(value),
        }
    }

    pub fn tag_name(&self) -> &'static str {
        match self {
            Comparison::Unary { op, .. } => op.tag_name(),
            Comparison::Binary { op, .. } => op.tag_name(),
        }
    }

    /// Substitutes the inverse operator, or wraps in NOT when there is none.
    pub fn negate(self) -> Predicate {
        match self {
            Comparison::Unary { op, field } => match op.inverse() {
                Some(inverse) => Comparison::Unary { op: inverse, field }.into(),
                None => Predicate::wrap_not(Comparison::Unary { op, field }.into()),
            },
            Comparison::Binary { op, field, value } => match op.inverse() {
                Some(inverse) => Comparison::Binary {
                    op: inverse,
                    field,
                    value,
                }
                .into(),
                None => Predicate::wrap_not(Comparison::Binary { op, field, value }.into()),
            },
        }
    }

    /// Replaces every deferred slot by the literal it resolves to.
    pub fn resolve<S>(&self, params: &S) -> Result<Comparison, BindingError>
    where
        S: ParameterSource + ?Sized,
    {
        let field = FieldRef::new(FieldName::Fixed(self.field().name.resolve(params)?));
        Ok(match self {
            Comparison::Unary { op, .. } => Comparison::Unary { op: *op, field },
            Comparison::Binary { op, value, .. } => Comparison::Binary {
                op: *op,
                field,
                value: value.resolve(params)?,
            },
        })
    }
}

/// A left-leaning binary tree of predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalJoin {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl LogicalJoin {
    pub fn operator(&self) -> LogicalOperator {
        match self {
            LogicalJoin::And(..) => LogicalOperator::And,
            LogicalJoin::Or(..) => LogicalOperator::Or,
            LogicalJoin::Not(_) => LogicalOperator::Not,
        }
    }

    pub fn tag_name(&self) -> &'static str {
        match self {
            LogicalJoin::And(..) => "And",
            LogicalJoin::Or(..) => "Or",
            LogicalJoin::Not(_) => "Not",
        }
    }
}

/// A boolean-valued expression over field comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(Comparison),
    Logical(LogicalJoin),
}

impl Predicate {
    /// Joins two predicates, `first` being rendered first.
    pub fn join(op: JoinOperator, first: Predicate, second: Predicate) -> Predicate {
        let (first, second) = (Box::new(first), Box::new(second));
        Predicate::Logical(match op {
            JoinOperator::And => LogicalJoin::And(first, second),
            JoinOperator::Or => LogicalJoin::Or(first, second),
        })
    }

    /// `IsNull` on the identifier column, which no item satisfies.
    pub fn always_false() -> Predicate {
        Comparison::unary(UnaryOperator::IsNull, ID_FIELD).into()
    }

    /// Wraps in a NOT node without simplification.
    pub fn wrap_not(inner: Predicate) -> Predicate {
        Predicate::Logical(LogicalJoin::Not(Box::new(inner)))
    }

    /// Logical negation: operator inversion for comparisons, De Morgan for
    /// AND/OR, and unwrapping of a double negation.
    pub fn negate(self) -> Predicate {
        match self {
            Predicate::Comparison(cmp) => cmp.negate(),
            Predicate::Logical(LogicalJoin::And(a, b)) => {
                Predicate::negate_join(JoinOperator::And, *a, *b)
            }
            Predicate::Logical(LogicalJoin::Or(a, b)) => {
                Predicate::negate_join(JoinOperator::Or, *a, *b)
            }
            Predicate::Logical(LogicalJoin::Not(inner)) => *inner,
        }
    }

    fn negate_join(op: JoinOperator, a: Predicate, b: Predicate) -> Predicate {
        Predicate::join(op.dual(), a.negate(), b.negate())
    }

    /// Every comparison in rendering order.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Predicate::Comparison(cmp) => out.push(cmp),
            Predicate::Logical(LogicalJoin::And(a, b) | LogicalJoin::Or(a, b)) => {
                a.collect_comparisons(out);
                b.collect_comparisons(out);
            }
            Predicate::Logical(LogicalJoin::Not(inner)) => inner.collect_comparisons(out),
        }
    }

    pub fn resolve<S>(&self, params: &S) -> Result<Predicate, BindingError>
    where
        S: ParameterSource + ?Sized,
    {
        Ok(match self {
            Predicate::Comparison(cmp) => Predicate::Comparison(cmp.resolve(params)?),
            Predicate::Logical(LogicalJoin::And(a, b)) => {
                Predicate::join(JoinOperator::And, a.resolve(params)?, b.resolve(params)?)
            }
            Predicate::Logical(LogicalJoin::Or(a, b)) => {
                Predicate::join(JoinOperator::Or, a.resolve(params)?, b.resolve(params)?)
            }
            Predicate::Logical(LogicalJoin::Not(inner)) => {
                Predicate::wrap_not(inner.resolve(params)?)
            }
        })
    }
}

impl From<Comparison> for Predicate {
    fn from(cmp: Comparison) -> Self {
        Predicate::Comparison(cmp)
    }
}

impl From<LogicalJoin> for Predicate {
    fn from(join: LogicalJoin) -> Self {
        Predicate::Logical(join)
    }
}
