//! The expression tree and its classification into clause families.

use crate::field::{
    ClauseField, ClauseList, FieldName, GroupByClause, GroupFieldRef, SortFieldRef, ViewFieldRef,
};
use crate::predicate::{Comparison, LogicalJoin, Predicate};
use crate::query::{BindingEnvelope, Query};
use camlkit_binding::{BindingError, Layered, ParameterMap, ParameterSource};
use std::collections::BTreeSet;
use std::fmt;

/// The clause family a node belongs to. Only compatible families combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// The neutral empty marker; combines with anything.
    Neutral,
    Filter,
    Sort,
    Group,
    Selection,
    /// A composite of filter, sort and group clauses.
    Query,
}

impl Family {
    pub fn is_compatible(self, other: Family) -> bool {
        match (self, other) {
            (Family::Neutral, _) | (_, Family::Neutral) => true,
            (Family::Selection, Family::Selection) => true,
            (Family::Selection, _) | (_, Family::Selection) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Family::Neutral => "neutral",
            Family::Filter => "filter",
            Family::Sort => "sort",
            Family::Group => "group",
            Family::Selection => "selection",
            Family::Query => "query",
        })
    }
}

/// The concrete kind of a node, as reported in diagnostics and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Neutral,
    True,
    False,
    Comparison,
    Logical,
    ViewField,
    ViewFields,
    SortField,
    OrderBy,
    GroupField,
    GroupBy,
    Query,
    Bound,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Neutral => "Neutral",
            NodeKind::True => "True",
            NodeKind::False => "False",
            NodeKind::Comparison => "Comparison",
            NodeKind::Logical => "Logical",
            NodeKind::ViewField => "ViewField",
            NodeKind::ViewFields => "ViewFields",
            NodeKind::SortField => "SortField",
            NodeKind::OrderBy => "OrderBy",
            NodeKind::GroupField => "GroupField",
            NodeKind::GroupBy => "GroupBy",
            NodeKind::Query => "Query",
            NodeKind::Bound => "Bound",
        })
    }
}

/// Algebraic identities that stand in for a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmptyMarker {
    /// Absorbed by whatever it is combined with.
    Neutral,
    /// Identity for AND, absorbing for OR.
    True,
    /// Identity for OR, absorbing for AND.
    False,
}

impl EmptyMarker {
    pub fn negate(self) -> Self {
        match self {
            EmptyMarker::Neutral => EmptyMarker::Neutral,
            EmptyMarker::True => EmptyMarker::False,
            EmptyMarker::False => EmptyMarker::True,
        }
    }
}

/// An immutable query expression.
///
/// Nodes are combined with [`Expression::and`], [`Expression::or`] and
/// [`Expression::negate`] (or the `&`, `|` and `!` operators), which always
/// build new trees.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Empty(EmptyMarker),
    Predicate(Predicate),
    ViewField(ViewFieldRef),
    ViewFields(ClauseList<ViewFieldRef>),
    SortField(SortFieldRef),
    OrderBy(ClauseList<SortFieldRef>),
    GroupField(GroupFieldRef),
    GroupBy(GroupByClause),
    Query(Query),
    Bound(BindingEnvelope),
}

impl Default for Expression {
    fn default() -> Self {
        Expression::Empty(EmptyMarker::Neutral)
    }
}

impl Expression {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expression::Empty(EmptyMarker::Neutral) => NodeKind::Neutral,
            Expression::Empty(EmptyMarker::True) => NodeKind::True,
            Expression::Empty(EmptyMarker::False) => NodeKind::False,
            Expression::Predicate(Predicate::Comparison(_)) => NodeKind::Comparison,
            Expression::Predicate(Predicate::Logical(_)) => NodeKind::Logical,
            Expression::ViewField(_) => NodeKind::ViewField,
            Expression::ViewFields(_) => NodeKind::ViewFields,
            Expression::SortField(_) => NodeKind::SortField,
            Expression::OrderBy(_) => NodeKind::OrderBy,
            Expression::GroupField(_) => NodeKind::GroupField,
            Expression::GroupBy(_) => NodeKind::GroupBy,
            Expression::Query(_) => NodeKind::Query,
            Expression::Bound(_) => NodeKind::Bound,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Expression::Empty(EmptyMarker::Neutral) => Family::Neutral,
            Expression::Empty(_) | Expression::Predicate(_) => Family::Filter,
            Expression::ViewField(_) | Expression::ViewFields(_) => Family::Selection,
            Expression::SortField(_) | Expression::OrderBy(_) => Family::Sort,
            Expression::GroupField(_) | Expression::GroupBy(_) => Family::Group,
            Expression::Query(_) => Family::Query,
            Expression::Bound(env) => env.inner().family(),
        }
    }

    /// Combination rank: of two operands, the one with the higher rank owns
    /// the merge.
    pub fn priority(&self) -> u8 {
        match self {
            Expression::ViewField(_) | Expression::SortField(_) | Expression::GroupField(_) => 1,
            Expression::ViewFields(_) | Expression::OrderBy(_) | Expression::GroupBy(_) => 2,
            Expression::Predicate(Predicate::Comparison(_)) => 3,
            Expression::Predicate(Predicate::Logical(_)) => 4,
            Expression::Query(_) => 5,
            Expression::Bound(_) => 6,
            Expression::Empty(_) => 7,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Expression::Empty(_))
    }

    /// Attaches deferred parameter values to the tree.
    pub fn bind(self, params: ParameterMap) -> Expression {
        Expression::Bound(BindingEnvelope::new(self, params))
    }

    /// Every deferred parameter referenced in the tree, field names included.
    pub fn parameter_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_parameter_names(&mut names);
        names
    }

    fn collect_parameter_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Expression::Empty(_) => {}
            Expression::Predicate(p) => predicate_parameter_names(p, names),
            Expression::ViewField(f) => field_parameter_name(&f.name, names),
            Expression::SortField(f) => field_parameter_name(&f.name, names),
            Expression::GroupField(f) => field_parameter_name(&f.name, names),
            Expression::ViewFields(list) => list_parameter_names(list, names),
            Expression::OrderBy(list) => list_parameter_names(list, names),
            Expression::GroupBy(clause) => list_parameter_names(&clause.fields, names),
            Expression::Query(q) => {
                if let Some(filter) = &q.filter {
                    predicate_parameter_names(filter, names);
                }
                if let Some(order_by) = &q.order_by {
                    list_parameter_names(order_by, names);
                }
                if let Some(group_by) = &q.group_by {
                    list_parameter_names(&group_by.fields, names);
                }
            }
            Expression::Bound(env) => env.inner().collect_parameter_names(names),
        }
    }

    /// Replaces deferred values and field names by the literals they resolve
    /// to, yielding the tree the rendered markup reads back as: envelopes are
    /// dissolved and lone clause fields become one-element lists.
    pub fn resolve(&self, params: &dyn ParameterSource) -> Result<Expression, BindingError> {
        Ok(match self {
            Expression::Empty(marker) => Expression::Empty(*marker),
            Expression::Predicate(p) => Expression::Predicate(p.resolve(params)?),
            Expression::ViewField(f) => {
                Expression::ViewFields(ClauseList::single(resolve_view_field(f, params)?))
            }
            Expression::SortField(f) => {
                Expression::OrderBy(ClauseList::single(resolve_sort_field(f, params)?))
            }
            Expression::GroupField(f) => Expression::GroupBy(GroupByClause::new(
                ClauseList::single(resolve_group_field(f, params)?),
            )),
            Expression::ViewFields(list) => {
                Expression::ViewFields(resolve_list(list, params, resolve_view_field)?)
            }
            Expression::OrderBy(list) => {
                Expression::OrderBy(resolve_list(list, params, resolve_sort_field)?)
            }
            Expression::GroupBy(clause) => Expression::GroupBy(resolve_group_by(clause, params)?),
            Expression::Query(q) => Expression::Query(Query {
                filter: q.filter.as_ref().map(|p| p.resolve(params)).transpose()?,
                order_by: q
                    .order_by
                    .as_ref()
                    .map(|list| resolve_list(list, params, resolve_sort_field))
                    .transpose()?,
                group_by: q
                    .group_by
                    .as_ref()
                    .map(|clause| resolve_group_by(clause, params))
                    .transpose()?,
            }),
            Expression::Bound(env) => {
                let layered = Layered::new(env.params(), params);
                env.inner().resolve(&layered)?
            }
        })
    }
}

fn field_parameter_name(name: &FieldName, names: &mut BTreeSet<String>) {
    if let Some(param) = name.parameter_name() {
        names.insert(param.to_string());
    }
}

fn list_parameter_names<T: ClauseField>(list: &ClauseList<T>, names: &mut BTreeSet<String>) {
    for field in list.iter() {
        field_parameter_name(field.name(), names);
    }
}

fn predicate_parameter_names(predicate: &Predicate, names: &mut BTreeSet<String>) {
    for cmp in predicate.comparisons() {
        field_parameter_name(&cmp.field().name, names);
        if let Some(param) = cmp.value().and_then(|v| v.parameter_name()) {
            names.insert(param.to_string());
        }
    }
}

fn resolve_name(name: &FieldName, params: &dyn ParameterSource) -> Result<FieldName, BindingError> {
    Ok(FieldName::Fixed(name.resolve(params)?))
}

fn resolve_view_field(
    f: &ViewFieldRef,
    params: &dyn ParameterSource,
) -> Result<ViewFieldRef, BindingError> {
    Ok(ViewFieldRef {
        name: resolve_name(&f.name, params)?,
        nullable: f.nullable,
    })
}

fn resolve_sort_field(
    f: &SortFieldRef,
    params: &dyn ParameterSource,
) -> Result<SortFieldRef, BindingError> {
    Ok(SortFieldRef {
        name: resolve_name(&f.name, params)?,
        ascending: f.ascending,
    })
}

fn resolve_group_field(
    f: &GroupFieldRef,
    params: &dyn ParameterSource,
) -> Result<GroupFieldRef, BindingError> {
    Ok(GroupFieldRef::new(resolve_name(&f.name, params)?))
}

fn resolve_list<T, F>(
    list: &ClauseList<T>,
    params: &dyn ParameterSource,
    resolve: F,
) -> Result<ClauseList<T>, BindingError>
where
    T: ClauseField,
    F: Fn(&T, &dyn ParameterSource) -> Result<T, BindingError>,
{
    list.iter().map(|f| resolve(f, params)).collect()
}

fn resolve_group_by(
    clause: &GroupByClause,
    params: &dyn ParameterSource,
) -> Result<GroupByClause, BindingError> {
    Ok(GroupByClause {
        fields: resolve_list(&clause.fields, params, resolve_group_field)?,
        collapse: clause.collapse,
    })
}

impl From<EmptyMarker> for Expression {
    fn from(marker: EmptyMarker) -> Self {
        Expression::Empty(marker)
    }
}

impl From<Predicate> for Expression {
    fn from(predicate: Predicate) -> Self {
        Expression::Predicate(predicate)
    }
}

impl From<Comparison> for Expression {
    fn from(cmp: Comparison) -> Self {
        Expression::Predicate(Predicate::Comparison(cmp))
    }
}

impl From<LogicalJoin> for Expression {
    fn from(join: LogicalJoin) -> Self {
        Expression::Predicate(Predicate::Logical(join))
    }
}

impl From<ViewFieldRef> for Expression {
    fn from(field: ViewFieldRef) -> Self {
        Expression::ViewField(field)
    }
}

impl From<SortFieldRef> for Expression {
    fn from(field: SortFieldRef) -> Self {
        Expression::SortField(field)
    }
}

impl From<GroupFieldRef> for Expression {
    fn from(field: GroupFieldRef) -> Self {
        Expression::GroupField(field)
    }
}

impl From<ClauseList<ViewFieldRef>> for Expression {
    fn from(list: ClauseList<ViewFieldRef>) -> Self {
        Expression::ViewFields(list)
    }
}

impl From<ClauseList<SortFieldRef>> for Expression {
    fn from(list: ClauseList<SortFieldRef>) -> Self {
        Expression::OrderBy(list)
    }
}

impl From<GroupByClause> for Expression {
    fn from(clause: GroupByClause) -> Self {
        Expression::GroupBy(clause)
    }
}

impl From<Query> for Expression {
    fn from(query: Query) -> Self {
        Expression::Query(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::BinaryOperator;
    use camlkit_binding::{ParamValue, ParameterBinding, ValueType};

    #[test]
    fn test_family_compatibility() {
        assert!(Family::Filter.is_compatible(Family::Sort));
        assert!(Family::Query.is_compatible(Family::Group));
        assert!(Family::Selection.is_compatible(Family::Selection));
        assert!(Family::Neutral.is_compatible(Family::Selection));
        assert!(!Family::Selection.is_compatible(Family::Filter));
        assert!(!Family::Query.is_compatible(Family::Selection));
    }

    #[test]
    fn test_priorities_are_ordered() {
        let field = Expression::SortField(SortFieldRef::ascending("A"));
        let list = Expression::OrderBy(ClauseList::single(SortFieldRef::ascending("A")));
        let cmp = Expression::from(Comparison::binary(BinaryOperator::Eq, "A", "x"));
        let query = Expression::Query(Query::default());
        let empty = Expression::default();
        assert!(field.priority() < list.priority());
        assert!(list.priority() < cmp.priority());
        assert!(cmp.priority() < query.priority());
        assert!(query.priority() < empty.priority());
    }

    #[test]
    fn test_parameter_names_include_field_names() {
        let cmp = Comparison::binary(
            BinaryOperator::Eq,
            FieldName::parameter("column"),
            ParameterBinding::parameter("status", ValueType::Text),
        );
        let names = Expression::from(cmp).parameter_names();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["column".to_string(), "status".to_string()]
        );
    }

    #[test]
    fn test_resolve_dissolves_envelope() {
        let cmp = Comparison::binary(
            BinaryOperator::Eq,
            "Status",
            ParameterBinding::parameter("status", ValueType::Text),
        );
        let mut params = ParameterMap::new();
        params.insert("status".into(), ParamValue::from("Active"));
        let bound = Expression::from(cmp).bind(params);
        assert_eq!(bound.kind(), NodeKind::Bound);
        assert_eq!(bound.family(), Family::Filter);

        let resolved = bound.resolve(&ParameterMap::new()).unwrap();
        assert_eq!(
            resolved,
            Expression::from(Comparison::binary(BinaryOperator::Eq, "Status", "Active"))
        );
    }

    #[test]
    fn test_resolve_turns_lone_field_into_list() {
        let field = Expression::SortField(SortFieldRef::descending("Created"));
        assert_eq!(
            field.resolve(&ParameterMap::new()).unwrap(),
            Expression::OrderBy(ClauseList::single(SortFieldRef::descending("Created")))
        );
    }
}
