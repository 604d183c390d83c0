//! Strongly-typed CAML query expressions.
//!
//! Build filters and clause lists with [`caml`], combine them with `&`, `|`
//! and `!`, then render them with [`Render`] or read markup back with
//! [`parse`]. Values can be deferred behind named parameters and bound at
//! render time from any [`ParameterSource`].

pub mod cli;
pub mod error;

pub use camlkit_binding as binding;
pub use camlkit_expr as expr;
pub use camlkit_xml as xml;

pub use camlkit_binding::{
    BindingError, DynamicValue, Layered, ModerationStatus, NoParameters, ParamValue,
    ParameterBinding, ParameterMap, ParameterSource, ValueType,
};
pub use camlkit_expr::{
    BinaryOperator, EmptyMarker, ExprError, Expression, Family, JoinOperator, LogicalOperator,
    MembershipKind, NodeKind, Rewriter, UnaryOperator, caml,
};
pub use camlkit_xml::{CamlError, ParseOptions, Render, RenderOptions, parse, parse_with};
pub use error::CamlkitError;
