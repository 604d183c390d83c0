//! Typed, optionally deferred value slots.

use crate::error::BindingError;
use crate::format::{format_value, parse_literal};
use crate::source::ParameterSource;
use crate::value::{BoundValue, DynamicValue, ModerationStatus, ParamValue, ValueType};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Maps a raw bound value to the shape the slot's value type expects.
pub type Converter = Arc<dyn Fn(&ParamValue) -> Result<ParamValue, BindingError> + Send + Sync>;

/// Where a slot's values come from.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingSource {
    /// One or more immediate values.
    Values(Vec<ParamValue>),
    /// A named parameter, looked up at bind time.
    Parameter(String),
}

/// A value slot of a comparison.
///
/// Equality ignores the converter: two slots are equal when they read the same
/// source with the same declared type.
#[derive(Clone)]
pub struct ParameterBinding {
    source: BindingSource,
    value_type: ValueType,
    include_time: bool,
    converter: Option<Converter>,
}

impl ParameterBinding {
    pub fn value(value: impl Into<ParamValue>, value_type: ValueType) -> Self {
        Self::values([value], value_type)
    }

    pub fn values<I>(values: I, value_type: ValueType) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ParamValue>,
    {
        Self {
            source: BindingSource::Values(values.into_iter().map(Into::into).collect()),
            value_type,
            include_time: false,
            converter: None,
        }
    }

    pub fn parameter(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            source: BindingSource::Parameter(name.into()),
            value_type,
            include_time: false,
            converter: None,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::value(value.into(), ValueType::Text)
    }

    pub fn integer(value: i64) -> Self {
        Self::value(value, ValueType::Integer)
    }

    pub fn number(value: f64) -> Self {
        Self::value(value, ValueType::Number)
    }

    pub fn boolean(value: bool) -> Self {
        Self::value(value, ValueType::Boolean)
    }

    pub fn guid(value: Uuid) -> Self {
        Self::value(value, ValueType::Guid)
    }

    pub fn lookup_id(id: i64) -> Self {
        Self::value(id, ValueType::Lookup)
    }

    pub fn url(value: impl Into<String>) -> Self {
        Self::value(value.into(), ValueType::Url)
    }

    pub fn content_type_id(value: impl Into<String>) -> Self {
        Self::value(value.into(), ValueType::ContentTypeId)
    }

    pub fn moderation_status(status: ModerationStatus) -> Self {
        Self::value(status, ValueType::ModStat)
    }

    pub fn date(value: NaiveDate) -> Self {
        Self::value(value, ValueType::DateTime)
    }

    pub fn date_time(value: NaiveDateTime) -> Self {
        Self::value(value, ValueType::DateTime).with_include_time(true)
    }

    pub fn current_user() -> Self {
        Self::value(DynamicValue::CurrentUser, ValueType::Integer)
    }

    pub fn today() -> Self {
        Self::today_offset(0)
    }

    pub fn today_offset(offset_days: i32) -> Self {
        Self::value(DynamicValue::Today { offset_days }, ValueType::DateTime)
    }

    pub fn now() -> Self {
        Self::value(DynamicValue::Now, ValueType::DateTime).with_include_time(true)
    }

    /// Controls whether date-time values carry their time-of-day component.
    pub fn with_include_time(mut self, include_time: bool) -> Self {
        self.include_time = include_time;
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Installs a conversion applied to every raw value before formatting.
    pub fn with_converter<F>(mut self, converter: F) -> Self
    where
        F: Fn(&ParamValue) -> Result<ParamValue, BindingError> + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    pub fn source(&self) -> &BindingSource {
        &self.source
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn include_time(&self) -> bool {
        self.include_time
    }

    pub fn parameter_name(&self) -> Option<&str> {
        match &self.source {
            BindingSource::Parameter(name) => Some(name),
            BindingSource::Values(_) => None,
        }
    }

    fn slot(&self) -> String {
        match &self.source {
            BindingSource::Parameter(name) => format!("parameter '{}'", name),
            BindingSource::Values(_) => "literal value".to_string(),
        }
    }

    /// Resolves the slot to a single formatted value.
    pub fn bind_one<S>(&self, params: &S) -> Result<BoundValue, BindingError>
    where
        S: ParameterSource + ?Sized,
    {
        let raw = self.resolve_raw(params)?;
        match raw.as_slice() {
            [] => Err(BindingError::EmptyCollection { slot: self.slot() }),
            [single] => self.format(single),
            many => Err(BindingError::MultipleValues {
                slot: self.slot(),
                count: many.len(),
            }),
        }
    }

    /// Resolves the slot to one or more formatted values.
    pub fn bind_many<S>(&self, params: &S) -> Result<Vec<BoundValue>, BindingError>
    where
        S: ParameterSource + ?Sized,
    {
        let raw = self.resolve_raw(params)?;
        if raw.is_empty() {
            return Err(BindingError::EmptyCollection { slot: self.slot() });
        }
        raw.iter().map(|v| self.format(v)).collect()
    }

    /// Replaces the slot by the immediate values it resolves to, in the form
    /// they take once rendered and read back.
    pub fn resolve<S>(&self, params: &S) -> Result<ParameterBinding, BindingError>
    where
        S: ParameterSource + ?Sized,
    {
        let values = self
            .bind_many(params)?
            .into_iter()
            .map(|bound| match bound {
                BoundValue::Dynamic(d) => Ok(ParamValue::Dynamic(d)),
                BoundValue::Text(text) => parse_literal(&text, self.value_type).ok_or_else(|| {
                    BindingError::wrong_type(self.slot(), self.value_type, "text")
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ParameterBinding {
            source: BindingSource::Values(values),
            value_type: self.value_type,
            include_time: self.include_time,
            converter: None,
        })
    }

    fn resolve_raw<S>(&self, params: &S) -> Result<Vec<ParamValue>, BindingError>
    where
        S: ParameterSource + ?Sized,
    {
        let mut out = Vec::new();
        match &self.source {
            BindingSource::Values(values) => {
                for value in values {
                    self.collect(value, &mut out)?;
                }
            }
            BindingSource::Parameter(name) => {
                let value = params
                    .lookup(name)
                    .ok_or_else(|| BindingError::missing(name.clone()))?;
                log::trace!("Resolved parameter '{}' to {}", name, value.kind_name());
                self.collect(&value, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Flattens lists, applies the converter and rejects nulls.
    fn collect(&self, value: &ParamValue, out: &mut Vec<ParamValue>) -> Result<(), BindingError> {
        match value {
            ParamValue::Null => Err(BindingError::NullValue { slot: self.slot() }),
            ParamValue::List(items) => {
                for item in items {
                    self.collect(item, out)?;
                }
                Ok(())
            }
            other => match &self.converter {
                Some(convert) => match convert(other)? {
                    ParamValue::Null => Err(BindingError::NullValue { slot: self.slot() }),
                    ParamValue::List(items) => {
                        out.extend(items);
                        Ok(())
                    }
                    converted => {
                        out.push(converted);
                        Ok(())
                    }
                },
                None => {
                    out.push(other.clone());
                    Ok(())
                }
            },
        }
    }

    fn format(&self, value: &ParamValue) -> Result<BoundValue, BindingError> {
        format_value(value, self.value_type, self.include_time).ok_or_else(|| {
            BindingError::wrong_type(self.slot(), self.value_type, value.kind_name())
        })
    }
}

impl PartialEq for ParameterBinding {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.value_type == other.value_type
            && self.include_time == other.include_time
    }
}

impl fmt::Debug for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBinding")
            .field("source", &self.source)
            .field("value_type", &self.value_type)
            .field("include_time", &self.include_time)
            .field("converter", &self.converter.as_ref().map(|_| ".."))
            .finish()
    }
}

impl From<ParamValue> for ParameterBinding {
    fn from(value: ParamValue) -> Self {
        let value_type = value.natural_type();
        let include_time = matches!(value, ParamValue::Dynamic(DynamicValue::Now));
        Self::value(value, value_type).with_include_time(include_time)
    }
}

macro_rules! binding_from_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ParameterBinding {
                fn from(value: $ty) -> Self {
                    ParameterBinding::from(ParamValue::from(value))
                }
            }
        )*
    };
}

binding_from_literal!(
    &str,
    String,
    i64,
    i32,
    u32,
    f64,
    bool,
    Uuid,
    NaiveDate,
    ModerationStatus,
    DynamicValue,
);

impl From<NaiveDateTime> for ParameterBinding {
    fn from(value: NaiveDateTime) -> Self {
        ParameterBinding::date_time(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParameterBinding {
    fn from(values: Vec<T>) -> Self {
        let values: Vec<ParamValue> = values.into_iter().map(Into::into).collect();
        let value_type = values.first().map_or(ValueType::Text, ParamValue::natural_type);
        Self::values(values, value_type)
    }
}
