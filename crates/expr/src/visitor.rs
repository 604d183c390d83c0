//! Bottom-up tree rewriting.
//!
//! # Usage
//!
//! Implement `Rewriter` for your struct and override the `visit_*` hooks for
//! the nodes you want to replace. Call the matching `walk_*` function inside an
//! override to keep descending into children.
//!
//! ```ignore
//! struct DropDrafts;
//!
//! impl Rewriter for DropDrafts {
//!     fn visit_comparison(&mut self, cmp: &Comparison) -> Result<Expression, ExprError> {
//!         if cmp.field().name == FieldName::from("_IsDraft") {
//!             return Ok(caml::always());
//!         }
//!         Ok(Expression::from(cmp.clone()))
//!     }
//! }
//! ```
//!
//! Every replacement is checked against the family of the slot it goes back
//! into; a mismatch fails with [`ExprError::IncompatibleReplacement`]. Nodes
//! whose children all come back unchanged are returned as they were; others
//! are rebuilt through [`combine`], so clause lists are re-flattened and
//! deduplicated.

use crate::combine::combine;
use crate::error::ExprError;
use crate::expression::{EmptyMarker, Expression, Family};
use crate::field::{
    ClauseField, ClauseList, GroupByClause, GroupFieldRef, SortFieldRef, ViewFieldRef,
};
use crate::operators::JoinOperator;
use crate::predicate::{Comparison, LogicalJoin, Predicate};
use crate::query::{BindingEnvelope, Query};

pub trait Rewriter: Sized {
    fn visit(&mut self, node: &Expression) -> Result<Expression, ExprError> {
        walk(self, node)
    }

    fn visit_empty(&mut self, marker: EmptyMarker) -> Result<Expression, ExprError> {
        Ok(Expression::Empty(marker))
    }

    fn visit_predicate(&mut self, predicate: &Predicate) -> Result<Expression, ExprError> {
        walk_predicate(self, predicate)
    }

    fn visit_comparison(&mut self, cmp: &Comparison) -> Result<Expression, ExprError> {
        Ok(Expression::from(cmp.clone()))
    }

    fn visit_logical(&mut self, join: &LogicalJoin) -> Result<Expression, ExprError> {
        walk_logical(self, join)
    }

    fn visit_view_field(&mut self, field: &ViewFieldRef) -> Result<Expression, ExprError> {
        Ok(Expression::ViewField(field.clone()))
    }

    fn visit_sort_field(&mut self, field: &SortFieldRef) -> Result<Expression, ExprError> {
        Ok(Expression::SortField(field.clone()))
    }

    fn visit_group_field(&mut self, field: &GroupFieldRef) -> Result<Expression, ExprError> {
        Ok(Expression::GroupField(field.clone()))
    }

    fn visit_view_fields(
        &mut self,
        list: &ClauseList<ViewFieldRef>,
    ) -> Result<Expression, ExprError> {
        walk_view_fields(self, list)
    }

    fn visit_order_by(&mut self, list: &ClauseList<SortFieldRef>) -> Result<Expression, ExprError> {
        walk_order_by(self, list)
    }

    fn visit_group_by(&mut self, clause: &GroupByClause) -> Result<Expression, ExprError> {
        walk_group_by(self, clause)
    }

    fn visit_query(&mut self, query: &Query) -> Result<Expression, ExprError> {
        walk_query(self, query)
    }

    fn visit_bound(&mut self, env: &BindingEnvelope) -> Result<Expression, ExprError> {
        walk_bound(self, env)
    }
}

impl Expression {
    /// Runs a rewriter over the tree and returns the rewritten tree.
    pub fn accept<R: Rewriter>(&self, rewriter: &mut R) -> Result<Expression, ExprError> {
        rewriter.visit(self)
    }
}

/// Accepts a replacement for a slot of the `expected` family. The neutral
/// marker fits anywhere and removes the slot; a query slot takes any of the
/// clause families it is made of.
fn expect_family(expected: Family, node: Expression) -> Result<Expression, ExprError> {
    let family = node.family();
    let fits = match expected {
        Family::Query => family != Family::Selection,
        _ => family == expected || family == Family::Neutral,
    };
    if fits {
        Ok(node)
    } else {
        Err(ExprError::IncompatibleReplacement {
            expected,
            actual: node.kind(),
        })
    }
}

fn is_unchanged(node: &Expression, original: &Predicate) -> bool {
    matches!(node, Expression::Predicate(p) if p == original)
}

pub fn walk<R: Rewriter>(rewriter: &mut R, node: &Expression) -> Result<Expression, ExprError> {
    match node {
        Expression::Empty(marker) => rewriter.visit_empty(*marker),
        Expression::Predicate(p) => rewriter.visit_predicate(p),
        Expression::ViewField(f) => rewriter.visit_view_field(f),
        Expression::ViewFields(list) => rewriter.visit_view_fields(list),
        Expression::SortField(f) => rewriter.visit_sort_field(f),
        Expression::OrderBy(list) => rewriter.visit_order_by(list),
        Expression::GroupField(f) => rewriter.visit_group_field(f),
        Expression::GroupBy(clause) => rewriter.visit_group_by(clause),
        Expression::Query(q) => rewriter.visit_query(q),
        Expression::Bound(env) => rewriter.visit_bound(env),
    }
}

pub fn walk_predicate<R: Rewriter>(
    rewriter: &mut R,
    predicate: &Predicate,
) -> Result<Expression, ExprError> {
    match predicate {
        Predicate::Comparison(cmp) => rewriter.visit_comparison(cmp),
        Predicate::Logical(join) => rewriter.visit_logical(join),
    }
}

pub fn walk_logical<R: Rewriter>(
    rewriter: &mut R,
    join: &LogicalJoin,
) -> Result<Expression, ExprError> {
    match join {
        LogicalJoin::And(a, b) | LogicalJoin::Or(a, b) => {
            let op = match join {
                LogicalJoin::And(..) => JoinOperator::And,
                _ => JoinOperator::Or,
            };
            let first = expect_family(Family::Filter, rewriter.visit_predicate(a)?)?;
            let second = expect_family(Family::Filter, rewriter.visit_predicate(b)?)?;
            if is_unchanged(&first, a) && is_unchanged(&second, b) {
                return Ok(Expression::from(join.clone()));
            }
            combine(first, second, op)
        }
        LogicalJoin::Not(inner) => {
            let rewritten = expect_family(Family::Filter, rewriter.visit_predicate(inner)?)?;
            if is_unchanged(&rewritten, inner) {
                return Ok(Expression::from(join.clone()));
            }
            rewritten.negate()
        }
    }
}

/// Visits every field of a list and folds the replacements back together.
/// Returns `None` when nothing changed.
fn rewrite_list<T, R, F>(
    rewriter: &mut R,
    list: &ClauseList<T>,
    unchanged: impl Fn(&Expression, &T) -> bool,
    mut visit: F,
) -> Result<Option<Expression>, ExprError>
where
    T: ClauseField,
    R: Rewriter,
    F: FnMut(&mut R, &T) -> Result<Expression, ExprError>,
{
    let mut changed = false;
    let mut rewritten = Vec::with_capacity(list.len());
    for field in list.iter() {
        let node = expect_family(T::FAMILY, visit(&mut *rewriter, field)?)?;
        changed |= !unchanged(&node, field);
        rewritten.push(node);
    }
    if !changed {
        return Ok(None);
    }
    let mut folded = Expression::Empty(EmptyMarker::Neutral);
    for node in rewritten {
        folded = combine(folded, node, JoinOperator::And)?;
    }
    Ok(Some(folded))
}

pub fn walk_view_fields<R: Rewriter>(
    rewriter: &mut R,
    list: &ClauseList<ViewFieldRef>,
) -> Result<Expression, ExprError> {
    let rewritten = rewrite_list(
        rewriter,
        list,
        |node, f| matches!(node, Expression::ViewField(n) if n.is_identical(f)),
        |r, f| r.visit_view_field(f),
    )?;
    Ok(match rewritten {
        None => Expression::ViewFields(list.clone()),
        Some(Expression::ViewField(f)) => Expression::ViewFields(ClauseList::single(f)),
        Some(other) => other,
    })
}

pub fn walk_order_by<R: Rewriter>(
    rewriter: &mut R,
    list: &ClauseList<SortFieldRef>,
) -> Result<Expression, ExprError> {
    let rewritten = rewrite_list(
        rewriter,
        list,
        |node, f| matches!(node, Expression::SortField(n) if n.is_identical(f)),
        |r, f| r.visit_sort_field(f),
    )?;
    Ok(match rewritten {
        None => Expression::OrderBy(list.clone()),
        Some(Expression::SortField(f)) => Expression::OrderBy(ClauseList::single(f)),
        Some(other) => other,
    })
}

pub fn walk_group_by<R: Rewriter>(
    rewriter: &mut R,
    clause: &GroupByClause,
) -> Result<Expression, ExprError> {
    let rewritten = rewrite_list(
        rewriter,
        &clause.fields,
        |node, f| matches!(node, Expression::GroupField(n) if n.is_identical(f)),
        |r, f| r.visit_group_field(f),
    )?;
    let fields = match rewritten {
        None => return Ok(Expression::GroupBy(clause.clone())),
        Some(Expression::GroupField(f)) => ClauseList::single(f),
        Some(Expression::GroupBy(rebuilt)) => rebuilt.fields,
        Some(other) => return Ok(other),
    };
    Ok(Expression::GroupBy(GroupByClause {
        fields,
        collapse: clause.collapse,
    }))
}

pub fn walk_query<R: Rewriter>(rewriter: &mut R, query: &Query) -> Result<Expression, ExprError> {
    let filter = query
        .filter
        .as_ref()
        .map(|p| rewriter.visit_predicate(p))
        .transpose()?
        .map(|node| expect_family(Family::Filter, node))
        .transpose()?;
    let order_by = query
        .order_by
        .as_ref()
        .map(|list| rewriter.visit_order_by(list))
        .transpose()?
        .map(|node| expect_family(Family::Sort, node))
        .transpose()?;
    let group_by = query
        .group_by
        .as_ref()
        .map(|clause| rewriter.visit_group_by(clause))
        .transpose()?
        .map(|node| expect_family(Family::Group, node))
        .transpose()?;

    let unchanged = match (&query.filter, &filter) {
        (Some(original), Some(node)) => is_unchanged(node, original),
        _ => true,
    } && match (&query.order_by, &order_by) {
        (Some(original), Some(Expression::OrderBy(list))) => list == original,
        (Some(_), Some(_)) => false,
        _ => true,
    } && match (&query.group_by, &group_by) {
        (Some(original), Some(Expression::GroupBy(clause))) => clause == original,
        (Some(_), Some(_)) => false,
        _ => true,
    };
    if unchanged {
        return Ok(Expression::Query(query.clone()));
    }

    let mut rebuilt = Expression::Empty(EmptyMarker::Neutral);
    for part in [filter, order_by, group_by].into_iter().flatten() {
        rebuilt = combine(rebuilt, part, JoinOperator::And)?;
    }
    Ok(rebuilt)
}

pub fn walk_bound<R: Rewriter>(
    rewriter: &mut R,
    env: &BindingEnvelope,
) -> Result<Expression, ExprError> {
    let inner = expect_family(env.inner().family(), rewriter.visit(env.inner())?)?;
    if &inner == env.inner() {
        return Ok(Expression::Bound(env.clone()));
    }
    Ok(Expression::Bound(BindingEnvelope::new(
        inner,
        env.params().clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldName;
    use crate::operators::BinaryOperator;

    fn eq(field: &str, value: &str) -> Expression {
        Comparison::binary(BinaryOperator::Eq, field, value).into()
    }

    struct Identity;

    impl Rewriter for Identity {}

    struct RenameField {
        from: &'static str,
        to: &'static str,
    }

    impl Rewriter for RenameField {
        fn visit_comparison(&mut self, cmp: &Comparison) -> Result<Expression, ExprError> {
            if cmp.field().name != FieldName::from(self.from) {
                return Ok(Expression::from(cmp.clone()));
            }
            let renamed = match cmp.clone() {
                Comparison::Unary { op, .. } => Comparison::unary(op, self.to),
                Comparison::Binary { op, value, .. } => Comparison::binary(op, self.to, value),
            };
            Ok(Expression::from(renamed))
        }

        fn visit_view_field(&mut self, field: &ViewFieldRef) -> Result<Expression, ExprError> {
            if field.name == FieldName::from(self.from) {
                Ok(Expression::ViewField(ViewFieldRef {
                    name: FieldName::from(self.to),
                    nullable: field.nullable,
                }))
            } else {
                Ok(Expression::ViewField(field.clone()))
            }
        }
    }

    struct SortIntoFilter;

    impl Rewriter for SortIntoFilter {
        fn visit_sort_field(&mut self, field: &SortFieldRef) -> Result<Expression, ExprError> {
            Ok(Comparison::unary(
                crate::operators::UnaryOperator::IsNotNull,
                field.name.clone(),
            )
            .into())
        }
    }

    struct DropTrue;

    impl Rewriter for DropTrue {
        fn visit_comparison(&mut self, cmp: &Comparison) -> Result<Expression, ExprError> {
            if cmp.field().name == FieldName::from("Drop") {
                Ok(Expression::Empty(EmptyMarker::True))
            } else {
                Ok(Expression::from(cmp.clone()))
            }
        }
    }

    struct FilterToMarker(EmptyMarker);

    impl Rewriter for FilterToMarker {
        fn visit_comparison(&mut self, _cmp: &Comparison) -> Result<Expression, ExprError> {
            Ok(Expression::Empty(self.0))
        }
    }

    #[test]
    fn test_marker_filter_keeps_query_clauses() {
        let order = ClauseList::single(SortFieldRef::ascending("Title"));
        let query = Query::new()
            .with_filter(Predicate::from(Comparison::binary(BinaryOperator::Eq, "A", "1")))
            .with_order_by(order.clone())
            .with_group_by(GroupByClause::new(ClauseList::single(GroupFieldRef::new("Region"))));
        let tree = Expression::Query(query.clone());

        let Expression::Query(rewritten) = tree
            .accept(&mut FilterToMarker(EmptyMarker::False))
            .unwrap()
        else {
            panic!("expected a query");
        };
        assert_eq!(rewritten.filter, Some(Predicate::always_false()));
        assert_eq!(rewritten.order_by, Some(order));
        assert_eq!(rewritten.group_by, query.group_by);

        let Expression::Query(rewritten) = tree
            .accept(&mut FilterToMarker(EmptyMarker::True))
            .unwrap()
        else {
            panic!("expected a query");
        };
        assert_eq!(rewritten.filter, None);
        assert!(rewritten.order_by.is_some() && rewritten.group_by.is_some());
    }

    #[test]
    fn test_identity_rewriter_returns_equal_tree() {
        let sort = Expression::SortField(SortFieldRef::ascending("Created"));
        let tree = ((eq("A", "1") | eq("B", "2")) & sort).unwrap();
        assert_eq!(tree.accept(&mut Identity).unwrap(), tree);
    }

    #[test]
    fn test_rename_inside_join() {
        let tree = (eq("A", "1") & eq("B", "2")).unwrap();
        let mut rewriter = RenameField { from: "B", to: "C" };
        assert_eq!(
            tree.accept(&mut rewriter).unwrap(),
            (eq("A", "1") & eq("C", "2")).unwrap()
        );
    }

    #[test]
    fn test_list_rewrite_dedups() {
        let list: ClauseList<ViewFieldRef> =
            ["A", "B", "C"].into_iter().map(ViewFieldRef::new).collect();
        let mut rewriter = RenameField { from: "B", to: "A" };
        let rewritten = Expression::ViewFields(list).accept(&mut rewriter).unwrap();
        let expected: ClauseList<ViewFieldRef> =
            ["A", "C"].into_iter().map(ViewFieldRef::new).collect();
        assert_eq!(rewritten, Expression::ViewFields(expected));
    }

    #[test]
    fn test_incompatible_replacement_fails() {
        let list = Expression::OrderBy(ClauseList::single(SortFieldRef::ascending("A")));
        let err = list.accept(&mut SortIntoFilter).unwrap_err();
        assert_eq!(
            err,
            ExprError::IncompatibleReplacement {
                expected: Family::Sort,
                actual: crate::expression::NodeKind::Comparison,
            }
        );
    }

    #[test]
    fn test_rebuild_simplifies_markers() {
        let tree = (eq("Drop", "1") & eq("Keep", "2")).unwrap();
        assert_eq!(tree.accept(&mut DropTrue).unwrap(), eq("Keep", "2"));
    }

    #[test]
    fn test_rewrite_inside_envelope() {
        let tree = eq("A", "1").bind(camlkit_binding::ParameterMap::new());
        let mut rewriter = RenameField { from: "A", to: "Z" };
        let Expression::Bound(env) = tree.accept(&mut rewriter).unwrap() else {
            panic!("expected an envelope");
        };
        assert_eq!(env.inner(), &eq("Z", "1"));
    }
}
