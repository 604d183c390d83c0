//! The composite query node and the deferred-binding envelope.

use crate::expression::Expression;
use crate::field::{ClauseList, GroupByClause, SortFieldRef};
use crate::operators::JoinOperator;
use crate::predicate::Predicate;
use camlkit_binding::ParameterMap;

/// Filter, sort and group clauses held together. Each is optional; a missing
/// filter matches every row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub filter: Option<Predicate>,
    pub order_by: Option<ClauseList<SortFieldRef>>,
    pub group_by: Option<GroupByClause>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order_by(mut self, order_by: ClauseList<SortFieldRef>) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_group_by(mut self, group_by: GroupByClause) -> Self {
        self.group_by = Some(group_by);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.order_by.is_none() && self.group_by.is_none()
    }

    /// Merges component-wise. Filters are joined with `op`; under OR a
    /// missing filter (match-all) absorbs the other. Clause lists are
    /// concatenated with `self_preceding` deciding the order.
    pub fn merge(self, other: Query, op: JoinOperator, self_preceding: bool) -> Query {
        let filter = match (self.filter, other.filter) {
            (Some(a), Some(b)) => Some(if self_preceding {
                Predicate::join(op, a, b)
            } else {
                Predicate::join(op, b, a)
            }),
            (Some(only), None) | (None, Some(only)) => match op {
                JoinOperator::And => Some(only),
                JoinOperator::Or => None,
            },
            (None, None) => None,
        };
        Query {
            filter,
            order_by: merge_option(self.order_by, other.order_by, |a, b| {
                a.concat(b, self_preceding)
            }),
            group_by: merge_option(self.group_by, other.group_by, |a, b| {
                a.concat(b, self_preceding)
            }),
        }
    }

    /// A query holding a single clause collapses back to that clause.
    pub(crate) fn into_clause_expression(self) -> Expression {
        match self {
            Query {
                filter: None,
                order_by: Some(order_by),
                group_by: None,
            } => Expression::OrderBy(order_by),
            Query {
                filter: None,
                order_by: None,
                group_by: Some(group_by),
            } => Expression::GroupBy(group_by),
            query => Expression::Query(query),
        }
    }
}

fn merge_option<T>(a: Option<T>, b: Option<T>, concat: impl FnOnce(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(concat(a, b)),
        (a, b) => a.or(b),
    }
}

/// An expression paired with the values of its deferred parameters.
///
/// Envelopes never nest: wrapping a bound expression merges both maps, the
/// inner values overriding the outer ones.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingEnvelope {
    inner: Box<Expression>,
    params: ParameterMap,
}

impl BindingEnvelope {
    pub fn new(inner: Expression, params: ParameterMap) -> Self {
        match inner {
            Expression::Bound(nested) => {
                let mut merged = params;
                merged.extend(nested.params);
                BindingEnvelope {
                    inner: nested.inner,
                    params: merged,
                }
            }
            inner => BindingEnvelope {
                inner: Box::new(inner),
                params,
            },
        }
    }

    pub fn inner(&self) -> &Expression {
        &self.inner
    }

    pub fn params(&self) -> &ParameterMap {
        &self.params
    }

    pub fn into_parts(self) -> (Expression, ParameterMap) {
        (*self.inner, self.params)
    }
}
