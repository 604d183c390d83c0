//! The CAML expression algebra.
//!
//! Expressions are immutable trees of comparisons, logical joins and clause
//! lists. They are built with the factory functions in [`caml`], combined with
//! `&`, `|` and `!`, and carry deferred parameter values in
//! [`BindingEnvelope`]s until they are rendered.

pub mod caml;
pub mod combine;
pub mod error;
pub mod expression;
pub mod field;
pub mod operators;
pub mod predicate;
pub mod query;
pub mod visitor;

pub use combine::combine;
pub use error::ExprError;
pub use expression::{EmptyMarker, Expression, Family, NodeKind};
pub use field::{
    ClauseField, ClauseList, FieldName, FieldRef, GroupByClause, GroupFieldRef, SortFieldRef,
    ViewFieldRef,
};
pub use operators::{
    BinaryOperator, JoinOperator, LogicalOperator, MembershipKind, UnaryOperator, ValueForm,
};
pub use predicate::{Comparison, LogicalJoin, Predicate};
pub use query::{BindingEnvelope, Query};
pub use visitor::Rewriter;
