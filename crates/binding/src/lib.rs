//! Typed, optionally deferred value slots for CAML comparisons.
//!
//! A [`ParameterBinding`] holds either immediate values or the name of a
//! parameter that is looked up in a [`ParameterSource`] when the expression is
//! rendered. Resolution formats each value for its declared [`ValueType`], or
//! yields a sentinel for host-relative [`DynamicValue`]s.

pub mod binding;
pub mod error;
pub mod format;
pub mod source;
pub mod value;

pub use binding::{BindingSource, Converter, ParameterBinding};
pub use error::BindingError;
pub use source::{Layered, NoParameters, ParameterMap, ParameterSource};
pub use value::{BoundValue, DynamicValue, ModerationStatus, ParamValue, ValueType};
