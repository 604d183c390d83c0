//! AND/OR combination dispatch and NOT.
//!
//! Of two operands, the one with the higher [`Expression::priority`] owns the
//! merge. It is told whether it was the left operand of the original call, so
//! the result keeps the caller's left-to-right order whichever side merges.

use crate::error::ExprError;
use crate::expression::{EmptyMarker, Expression, NodeKind};
use crate::field::{ClauseList, GroupByClause, ViewFieldRef};
use crate::operators::{JoinOperator, LogicalOperator};
use crate::predicate::Predicate;
use crate::query::{BindingEnvelope, Query};
use std::ops::{BitAnd, BitOr, Not};

/// Combines two expressions under `op`, `left` preceding `right`.
pub fn combine(left: Expression, right: Expression, op: JoinOperator) -> Result<Expression, ExprError> {
    let (left_kind, right_kind) = (left.kind(), right.kind());
    if !left.family().is_compatible(right.family()) {
        return Err(ExprError::invalid_join(op, left_kind, right_kind));
    }
    log::trace!(
        "Combining {} {} {}",
        left_kind,
        LogicalOperator::from(op),
        right_kind
    );
    if left.priority() >= right.priority() {
        left.merge(right, op, true)
    } else {
        right.merge(left, op, false)
    }
}

impl Expression {
    pub fn and(self, other: Expression) -> Result<Expression, ExprError> {
        combine(self, other, JoinOperator::And)
    }

    pub fn or(self, other: Expression) -> Result<Expression, ExprError> {
        combine(self, other, JoinOperator::Or)
    }

    /// Logical NOT. Comparisons invert their operator where they can, joins
    /// follow De Morgan, and containers negate their filter in place.
    pub fn negate(self) -> Result<Expression, ExprError> {
        match self {
            Expression::Empty(marker) => Ok(Expression::Empty(marker.negate())),
            Expression::Predicate(p) => Ok(Expression::Predicate(p.negate())),
            Expression::Query(q) => match q.filter {
                Some(filter) => Ok(Expression::Query(Query {
                    filter: Some(filter.negate()),
                    ..q
                })),
                None => Err(ExprError::invalid_not(NodeKind::Query)),
            },
            Expression::Bound(env) => {
                let (inner, params) = env.into_parts();
                Ok(Expression::Bound(BindingEnvelope::new(inner.negate()?, params)))
            }
            other => Err(ExprError::invalid_not(other.kind())),
        }
    }

    /// Merges `other` into `self`, which must be the owning operand.
    fn merge(
        self,
        other: Expression,
        op: JoinOperator,
        self_preceding: bool,
    ) -> Result<Expression, ExprError> {
        let (self_kind, other_kind) = (self.kind(), other.kind());
        let invalid = || {
            if self_preceding {
                ExprError::invalid_join(op, self_kind, other_kind)
            } else {
                ExprError::invalid_join(op, other_kind, self_kind)
            }
        };

        match self {
            Expression::Empty(marker) => Ok(merge_empty(marker, other, op)),
            Expression::Bound(env) => merge_bound(env, other, op, self_preceding),
            Expression::Query(query) => {
                let other = match other {
                    Expression::Query(other) => other,
                    Expression::Predicate(p) => Query::new().with_filter(p),
                    other if op == JoinOperator::And => {
                        clause_query(other).ok_or_else(invalid)?
                    }
                    _ => return Err(invalid()),
                };
                Ok(Expression::Query(query.merge(other, op, self_preceding)))
            }
            Expression::Predicate(p) => match other {
                Expression::Predicate(other) => Ok(Expression::Predicate(if self_preceding {
                    Predicate::join(op, p, other)
                } else {
                    Predicate::join(op, other, p)
                })),
                other if op == JoinOperator::And => {
                    let clauses = clause_query(other).ok_or_else(invalid)?;
                    Ok(Expression::Query(
                        Query::new()
                            .with_filter(p)
                            .merge(clauses, op, self_preceding),
                    ))
                }
                _ => Err(invalid()),
            },
            view @ (Expression::ViewField(_) | Expression::ViewFields(_)) => {
                match (op, view_list(view), view_list(other)) {
                    (JoinOperator::And, Some(a), Some(b)) => {
                        Ok(Expression::ViewFields(a.concat(b, self_preceding)))
                    }
                    _ => Err(invalid()),
                }
            }
            clause => match (op, clause_query(clause), clause_query(other)) {
                (JoinOperator::And, Some(a), Some(b)) => {
                    Ok(a.merge(b, op, self_preceding).into_clause_expression())
                }
                _ => Err(invalid()),
            },
        }
    }
}

fn merge_empty(marker: EmptyMarker, other: Expression, op: JoinOperator) -> Expression {
    if other == Expression::Empty(EmptyMarker::Neutral) {
        return Expression::Empty(marker);
    }
    match (marker, op) {
        (EmptyMarker::Neutral, _)
        | (EmptyMarker::True, JoinOperator::And)
        | (EmptyMarker::False, JoinOperator::Or) => other,
        (EmptyMarker::True, JoinOperator::Or) | (EmptyMarker::False, JoinOperator::And) => {
            absorb_filter(marker, other)
        }
    }
}

/// An absorbing marker decides the filter only: sort and group clauses of
/// `other` survive, with True leaving no filter and False the always-false one.
fn absorb_filter(marker: EmptyMarker, other: Expression) -> Expression {
    let query = match other {
        Expression::Query(query) => query,
        Expression::Bound(env) => {
            let (inner, params) = env.into_parts();
            return match absorb_filter(marker, inner) {
                Expression::Empty(marker) => Expression::Empty(marker),
                absorbed => Expression::Bound(BindingEnvelope::new(absorbed, params)),
            };
        }
        other => match clause_query(other) {
            Some(query) => query,
            None => return Expression::Empty(marker),
        },
    };
    if query.order_by.is_none() && query.group_by.is_none() {
        return Expression::Empty(marker);
    }
    let clauses = Query {
        filter: None,
        ..query
    };
    match marker {
        EmptyMarker::False => Expression::Query(clauses.with_filter(Predicate::always_false())),
        _ => clauses.into_clause_expression(),
    }
}

/// Sibling envelopes merge maps, the left operand's values winning; anything
/// else is combined inside the envelope.
fn merge_bound(
    env: BindingEnvelope,
    other: Expression,
    op: JoinOperator,
    self_preceding: bool,
) -> Result<Expression, ExprError> {
    let (inner, params) = env.into_parts();
    match other {
        Expression::Bound(other) => {
            let (other_inner, other_params) = other.into_parts();
            let ((first, first_params), (second, mut merged)) = if self_preceding {
                ((inner, params), (other_inner, other_params))
            } else {
                ((other_inner, other_params), (inner, params))
            };
            merged.extend(first_params);
            let combined = combine(first, second, op)?;
            Ok(Expression::Bound(BindingEnvelope::new(combined, merged)))
        }
        other => {
            let combined = if self_preceding {
                combine(inner, other, op)?
            } else {
                combine(other, inner, op)?
            };
            Ok(Expression::Bound(BindingEnvelope::new(combined, params)))
        }
    }
}

/// Lifts a sort or group node into a filterless query.
fn clause_query(expr: Expression) -> Option<Query> {
    match expr {
        Expression::SortField(field) => Some(Query::new().with_order_by(ClauseList::single(field))),
        Expression::OrderBy(list) => Some(Query::new().with_order_by(list)),
        Expression::GroupField(field) => {
            Some(Query::new().with_group_by(GroupByClause::new(ClauseList::single(field))))
        }
        Expression::GroupBy(clause) => Some(Query::new().with_group_by(clause)),
        _ => None,
    }
}

fn view_list(expr: Expression) -> Option<ClauseList<ViewFieldRef>> {
    match expr {
        Expression::ViewField(field) => Some(ClauseList::single(field)),
        Expression::ViewFields(list) => Some(list),
        _ => None,
    }
}

impl BitAnd for Expression {
    type Output = Result<Expression, ExprError>;

    fn bitand(self, rhs: Expression) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Expression {
    type Output = Result<Expression, ExprError>;

    fn bitor(self, rhs: Expression) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Expression {
    type Output = Result<Expression, ExprError>;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl BitAnd<Expression> for Result<Expression, ExprError> {
    type Output = Result<Expression, ExprError>;

    fn bitand(self, rhs: Expression) -> Self::Output {
        self?.and(rhs)
    }
}

impl BitOr<Expression> for Result<Expression, ExprError> {
    type Output = Result<Expression, ExprError>;

    fn bitor(self, rhs: Expression) -> Self::Output {
        self?.or(rhs)
    }
}

impl BitAnd<Result<Expression, ExprError>> for Expression {
    type Output = Result<Expression, ExprError>;

    fn bitand(self, rhs: Result<Expression, ExprError>) -> Self::Output {
        self.and(rhs?)
    }
}

impl BitOr<Result<Expression, ExprError>> for Expression {
    type Output = Result<Expression, ExprError>;

    fn bitor(self, rhs: Result<Expression, ExprError>) -> Self::Output {
        self.or(rhs?)
    }
}
