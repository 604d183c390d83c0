//! Read-only lookups that deferred parameters are resolved against.

use crate::value::ParamValue;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// The map type carried by binding envelopes.
pub type ParameterMap = HashMap<String, ParamValue>;

/// A named-value lookup consulted when a deferred slot is bound.
pub trait ParameterSource {
    fn lookup(&self, name: &str) -> Option<Cow<'_, ParamValue>>;
}

impl ParameterSource for HashMap<String, ParamValue> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, ParamValue>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl ParameterSource for BTreeMap<String, ParamValue> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, ParamValue>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl ParameterSource for serde_json::Map<String, serde_json::Value> {
    fn lookup(&self, name: &str) -> Option<Cow<'_, ParamValue>> {
        self.get(name).map(|v| Cow::Owned(ParamValue::from(v)))
    }
}

impl<S: ParameterSource + ?Sized> ParameterSource for &S {
    fn lookup(&self, name: &str) -> Option<Cow<'_, ParamValue>> {
        (**self).lookup(name)
    }
}

/// A source with no parameters at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParameters;

impl ParameterSource for NoParameters {
    fn lookup(&self, _name: &str) -> Option<Cow<'_, ParamValue>> {
        None
    }
}

/// Two sources stacked: names found in `primary` shadow those in `fallback`.
pub struct Layered<'a, P: ?Sized, F: ?Sized> {
    primary: &'a P,
    fallback: &'a F,
}

impl<'a, P: ?Sized, F: ?Sized> Layered<'a, P, F> {
    pub fn new(primary: &'a P, fallback: &'a F) -> Self {
        Self { primary, fallback }
    }
}

impl<P, F> ParameterSource for Layered<'_, P, F>
where
    P: ParameterSource + ?Sized,
    F: ParameterSource + ?Sized,
{
    fn lookup(&self, name: &str) -> Option<Cow<'_, ParamValue>> {
        self.primary
            .lookup(name)
            .or_else(|| self.fallback.lookup(name))
    }
}
