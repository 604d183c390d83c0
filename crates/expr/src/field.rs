//! Field references and the clause lists built from them.

use crate::expression::Family;
use camlkit_binding::{BindingError, BoundValue, ParameterBinding, ParameterSource, ValueType};
use indexmap::IndexSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The name of a column, either fixed or supplied as a parameter at render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldName {
    Fixed(String),
    Parameter(String),
}

impl FieldName {
    pub fn parameter(name: impl Into<String>) -> Self {
        FieldName::Parameter(name.into())
    }

    pub fn resolve<S>(&self, params: &S) -> Result<String, BindingError>
    where
        S: ParameterSource + ?Sized,
    {
        match self {
            FieldName::Fixed(name) => Ok(name.clone()),
            FieldName::Parameter(param) => {
                match ParameterBinding::parameter(param.clone(), ValueType::Text).bind_one(params)? {
                    BoundValue::Text(name) => Ok(name),
                    BoundValue::Dynamic(_) => Err(BindingError::wrong_type(
                        format!("parameter '{}'", param),
                        ValueType::Text,
                        "dynamic value",
                    )),
                }
            }
        }
    }

    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            FieldName::Parameter(name) => Some(name),
            FieldName::Fixed(_) => None,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::Fixed(name) => f.write_str(name),
            FieldName::Parameter(name) => write!(f, "${}", name),
        }
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        FieldName::Fixed(name.to_string())
    }
}

impl From<String> for FieldName {
    fn from(name: String) -> Self {
        FieldName::Fixed(name)
    }
}

/// The field operand of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub name: FieldName,
}

impl FieldRef {
    pub fn new(name: impl Into<FieldName>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        FieldRef::new(name)
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        FieldRef::new(name)
    }
}

impl From<FieldName> for FieldRef {
    fn from(name: FieldName) -> Self {
        FieldRef { name }
    }
}

/// A field that can live in a clause list.
///
/// Equality and hashing of clause fields consider the name only, so a list
/// never holds the same column twice. `is_identical` compares every attribute.
pub trait ClauseField: Clone + Eq + Hash + fmt::Debug {
    const FAMILY: Family;

    fn name(&self) -> &FieldName;

    fn is_identical(&self, other: &Self) -> bool;
}

macro_rules! name_keyed {
    ($ty:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.name == other.name
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.name.hash(state);
            }
        }
    };
}

/// A column in the selection list.
#[derive(Debug, Clone)]
pub struct ViewFieldRef {
    pub name: FieldName,
    pub nullable: bool,
}

impl ViewFieldRef {
    pub fn new(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

name_keyed!(ViewFieldRef);

impl ClauseField for ViewFieldRef {
    const FAMILY: Family = Family::Selection;

    fn name(&self) -> &FieldName {
        &self.name
    }

    fn is_identical(&self, other: &Self) -> bool {
        self.name == other.name && self.nullable == other.nullable
    }
}

/// A sort key.
#[derive(Debug, Clone)]
pub struct SortFieldRef {
    pub name: FieldName,
    pub ascending: bool,
}

impl SortFieldRef {
    pub fn ascending(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            ascending: true,
        }
    }

    pub fn descending(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            ascending: false,
        }
    }
}

name_keyed!(SortFieldRef);

impl ClauseField for SortFieldRef {
    const FAMILY: Family = Family::Sort;

    fn name(&self) -> &FieldName {
        &self.name
    }

    fn is_identical(&self, other: &Self) -> bool {
        self.name == other.name && self.ascending == other.ascending
    }
}

/// A group key.
#[derive(Debug, Clone)]
pub struct GroupFieldRef {
    pub name: FieldName,
}

impl GroupFieldRef {
    pub fn new(name: impl Into<FieldName>) -> Self {
        Self { name: name.into() }
    }
}

name_keyed!(GroupFieldRef);

impl ClauseField for GroupFieldRef {
    const FAMILY: Family = Family::Group;

    fn name(&self) -> &FieldName {
        &self.name
    }

    fn is_identical(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A deduplicating, order-preserving list of clause fields.
#[derive(Debug, Clone)]
pub struct ClauseList<T: ClauseField> {
    fields: IndexSet<T>,
}

impl<T: ClauseField> ClauseList<T> {
    pub fn new() -> Self {
        Self {
            fields: IndexSet::new(),
        }
    }

    pub fn single(field: T) -> Self {
        let mut fields = IndexSet::with_capacity(1);
        fields.insert(field);
        Self { fields }
    }

    /// Adds a field unless one with the same name is already listed.
    pub fn push(&mut self, field: T) -> bool {
        self.fields.insert(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &T) -> bool {
        self.fields.contains(field)
    }

    /// Joins two lists; `self_preceding` decides whose fields come first.
    /// The first occurrence of a name wins.
    pub fn concat(self, other: Self, self_preceding: bool) -> Self {
        let (mut first, second) = if self_preceding {
            (self, other)
        } else {
            (other, self)
        };
        first.fields.extend(second.fields);
        first
    }
}

impl<T: ClauseField> Default for ClauseList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ClauseField> PartialEq for ClauseList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.is_identical(b))
    }
}

impl<T: ClauseField> FromIterator<T> for ClauseList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<T: ClauseField> IntoIterator for ClauseList<T> {
    type Item = T;
    type IntoIter = indexmap::set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// The group-by clause: its keys plus the optional collapse flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupByClause {
    pub fields: ClauseList<GroupFieldRef>,
    pub collapse: Option<bool>,
}

impl GroupByClause {
    pub fn new(fields: ClauseList<GroupFieldRef>) -> Self {
        Self {
            fields,
            collapse: None,
        }
    }

    pub fn with_collapse(mut self, collapse: bool) -> Self {
        self.collapse = Some(collapse);
        self
    }

    pub fn concat(self, other: Self, self_preceding: bool) -> Self {
        let (first, second) = if self_preceding {
            (self, other)
        } else {
            (other, self)
        };
        GroupByClause {
            collapse: first.collapse.or(second.collapse),
            fields: first.fields.concat(second.fields, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_list(names: &[&str]) -> ClauseList<ViewFieldRef> {
        names.iter().map(|n| ViewFieldRef::new(*n)).collect()
    }

    #[test]
    fn test_concat_respects_preceding_flag() {
        let ab = view_list(&["A", "B"]);
        let c = view_list(&["C"]);
        assert_eq!(ab.clone().concat(c.clone(), true), view_list(&["A", "B", "C"]));
        assert_eq!(ab.concat(c, false), view_list(&["C", "A", "B"]));
    }

    #[test]
    fn test_duplicates_are_dropped_keeping_first() {
        let mut list: ClauseList<SortFieldRef> =
            [SortFieldRef::ascending("A"), SortFieldRef::ascending("B")]
                .into_iter()
                .collect();
        assert!(!list.push(SortFieldRef::descending("A")));
        assert_eq!(list.len(), 2);
        assert!(list.iter().next().is_some_and(|f| f.ascending));
    }

    #[test]
    fn test_list_equality_is_ordered_and_structural() {
        let asc: ClauseList<SortFieldRef> = [SortFieldRef::ascending("A")].into_iter().collect();
        let desc: ClauseList<SortFieldRef> = [SortFieldRef::descending("A")].into_iter().collect();
        assert_ne!(asc, desc);
        assert_ne!(view_list(&["A", "B"]), view_list(&["B", "A"]));
    }

    #[test]
    fn test_parameter_field_name_resolution() {
        let mut params = camlkit_binding::ParameterMap::new();
        params.insert("col".into(), "Title".into());
        assert_eq!(FieldName::parameter("col").resolve(&params).unwrap(), "Title");
        assert!(FieldName::parameter("other").resolve(&params).is_err());
    }
}
