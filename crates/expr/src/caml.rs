//! Factory functions for building expressions.
//!
//! ```ignore
//! use camlkit_expr::caml::{eq, gt, order_by_desc};
//!
//! let query = (eq("Status", "Active") & gt("Score", 50i64) & order_by_desc("Modified"))?;
//! ```

use crate::error::ExprError;
use crate::expression::{EmptyMarker, Expression};
use crate::field::{
    ClauseList, FieldName, FieldRef, GroupByClause, GroupFieldRef, SortFieldRef, ViewFieldRef,
};
use crate::operators::{BinaryOperator, MembershipKind, UnaryOperator};
use crate::predicate::Comparison;
use camlkit_binding::ParameterBinding;

fn binary(
    op: BinaryOperator,
    field: impl Into<FieldRef>,
    value: impl Into<ParameterBinding>,
) -> Expression {
    Comparison::binary(op, field, value).into()
}

pub fn eq(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Eq, field, value)
}

pub fn neq(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Neq, field, value)
}

pub fn gt(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Gt, field, value)
}

pub fn geq(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Geq, field, value)
}

pub fn lt(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Lt, field, value)
}

pub fn leq(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Leq, field, value)
}

/// Matches when the field starts with any of the bound values.
pub fn begins_with(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::BeginsWith, field, value)
}

/// Matches when the field contains any of the bound values.
pub fn contains(field: impl Into<FieldRef>, value: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Contains, field, value)
}

/// Matches when the field equals one of the bound values.
pub fn in_values(field: impl Into<FieldRef>, values: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::In, field, values)
}

/// Multi-value field holds any of the bound values.
pub fn includes(field: impl Into<FieldRef>, values: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::Includes, field, values)
}

/// Multi-value field holds none of the bound values.
pub fn not_includes(field: impl Into<FieldRef>, values: impl Into<ParameterBinding>) -> Expression {
    binary(BinaryOperator::NotIncludes, field, values)
}

pub fn is_null(field: impl Into<FieldRef>) -> Expression {
    Comparison::unary(UnaryOperator::IsNull, field).into()
}

pub fn is_not_null(field: impl Into<FieldRef>) -> Expression {
    Comparison::unary(UnaryOperator::IsNotNull, field).into()
}

pub fn membership(field: impl Into<FieldRef>, kind: MembershipKind) -> Expression {
    Comparison::unary(UnaryOperator::Membership(kind), field).into()
}

pub fn view_field(name: impl Into<FieldName>) -> Expression {
    Expression::ViewField(ViewFieldRef::new(name))
}

pub fn view_fields<I>(names: I) -> Expression
where
    I: IntoIterator,
    I::Item: Into<FieldName>,
{
    Expression::ViewFields(names.into_iter().map(ViewFieldRef::new).collect())
}

pub fn order_by(name: impl Into<FieldName>) -> Expression {
    Expression::SortField(SortFieldRef::ascending(name))
}

pub fn order_by_desc(name: impl Into<FieldName>) -> Expression {
    Expression::SortField(SortFieldRef::descending(name))
}

pub fn group_by(name: impl Into<FieldName>) -> Expression {
    Expression::GroupField(GroupFieldRef::new(name))
}

pub fn group_by_collapse<I>(names: I, collapse: bool) -> Expression
where
    I: IntoIterator,
    I::Item: Into<FieldName>,
{
    let fields: ClauseList<GroupFieldRef> = names.into_iter().map(GroupFieldRef::new).collect();
    Expression::GroupBy(GroupByClause::new(fields).with_collapse(collapse))
}

/// The always-true marker.
pub fn always() -> Expression {
    Expression::Empty(EmptyMarker::True)
}

/// The always-false marker.
pub fn never() -> Expression {
    Expression::Empty(EmptyMarker::False)
}

/// The neutral marker, absorbed by anything it is combined with.
pub fn empty() -> Expression {
    Expression::Empty(EmptyMarker::Neutral)
}

pub fn and(left: Expression, right: Expression) -> Result<Expression, ExprError> {
    left.and(right)
}

pub fn or(left: Expression, right: Expression) -> Result<Expression, ExprError> {
    left.or(right)
}

pub fn not(expr: Expression) -> Result<Expression, ExprError> {
    expr.negate()
}

/// Joins every expression with AND, starting from the neutral marker.
pub fn all<I>(exprs: I) -> Result<Expression, ExprError>
where
    I: IntoIterator<Item = Expression>,
{
    exprs.into_iter().try_fold(empty(), Expression::and)
}

/// Joins every expression with OR, starting from the neutral marker.
pub fn any<I>(exprs: I) -> Result<Expression, ExprError>
where
    I: IntoIterator<Item = Expression>,
{
    exprs.into_iter().try_fold(empty(), Expression::or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::NodeKind;
    use camlkit_binding::ValueType;

    #[test]
    fn test_operator_inverse_closure() {
        let pairs = [
            (eq("F", 1i64), neq("F", 1i64)),
            (gt("F", 1i64), leq("F", 1i64)),
            (lt("F", 1i64), geq("F", 1i64)),
            (includes("F", 1i64), not_includes("F", 1i64)),
            (is_null("F"), is_not_null("F")),
        ];
        for (a, b) in pairs {
            assert_eq!(not(a.clone()).unwrap(), b);
            assert_eq!(not(b).unwrap(), a);
        }
    }

    #[test]
    fn test_membership_negation_wraps() {
        let member = membership("Author", MembershipKind::CurrentUserGroups);
        let negated = not(member.clone()).unwrap();
        assert_eq!(negated.kind(), NodeKind::Logical);
        assert_eq!(not(negated).unwrap(), member);
    }

    #[test]
    fn test_all_and_any_fold() {
        assert_eq!(all([]).unwrap(), empty());
        assert_eq!(all([eq("A", "1")]).unwrap(), eq("A", "1"));
        assert_eq!(
            any([eq("A", "1"), eq("B", "2")]).unwrap(),
            or(eq("A", "1"), eq("B", "2")).unwrap()
        );
    }

    #[test]
    fn test_group_by_collapse() {
        let Expression::GroupBy(clause) = group_by_collapse(["Category", "Author"], true) else {
            panic!("expected a group-by clause");
        };
        assert_eq!(clause.collapse, Some(true));
        assert_eq!(clause.fields.len(), 2);
    }

    #[test]
    fn test_deferred_values() {
        let expr = eq("Status", ParameterBinding::parameter("status", ValueType::Text));
        assert!(expr.parameter_names().contains("status"));
    }
}
