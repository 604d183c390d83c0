//! Raw parameter values and the markup value-type vocabulary.

use chrono::{NaiveDate, NaiveDateTime};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The `Type` attribute of a `<Value>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Text,
    Lookup,
    Integer,
    Number,
    Boolean,
    Guid,
    DateTime,
    Url,
    ContentTypeId,
    ModStat,
}

impl ValueType {
    pub const ALL: [ValueType; 10] = [
        ValueType::Text,
        ValueType::Lookup,
        ValueType::Integer,
        ValueType::Number,
        ValueType::Boolean,
        ValueType::Guid,
        ValueType::DateTime,
        ValueType::Url,
        ValueType::ContentTypeId,
        ValueType::ModStat,
    ];

    /// The token written into the markup.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Text => "Text",
            ValueType::Lookup => "Lookup",
            ValueType::Integer => "Integer",
            ValueType::Number => "Number",
            ValueType::Boolean => "Boolean",
            ValueType::Guid => "Guid",
            ValueType::DateTime => "DateTime",
            ValueType::Url => "URL",
            ValueType::ContentTypeId => "ContentTypeId",
            ValueType::ModStat => "ModStat",
        }
    }

    /// Case-insensitive lookup of a markup token.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content approval state of a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModerationStatus {
    Approved,
    Rejected,
    Pending,
    Draft,
    Scheduled,
}

impl ModerationStatus {
    const ALL: [ModerationStatus; 5] = [
        ModerationStatus::Approved,
        ModerationStatus::Rejected,
        ModerationStatus::Pending,
        ModerationStatus::Draft,
        ModerationStatus::Scheduled,
    ];

    pub fn code(&self) -> i64 {
        match self {
            ModerationStatus::Approved => 0,
            ModerationStatus::Rejected => 1,
            ModerationStatus::Pending => 2,
            ModerationStatus::Draft => 3,
            ModerationStatus::Scheduled => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModerationStatus::Approved => "Approved",
            ModerationStatus::Rejected => "Rejected",
            ModerationStatus::Pending => "Pending",
            ModerationStatus::Draft => "Draft",
            ModerationStatus::Scheduled => "Scheduled",
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Accepts either the numeric code or the (case-insensitive) name.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Ok(code) = token.parse::<i64>() {
            return Self::from_code(code);
        }
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(token))
    }
}

/// A host-relative value that is rendered as a sentinel element instead of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicValue {
    /// `<UserID/>`
    CurrentUser,
    /// `<Today/>`, optionally shifted by `OffsetDays`.
    Today { offset_days: i32 },
    /// `<Now/>`
    Now,
}

impl DynamicValue {
    pub fn today() -> Self {
        DynamicValue::Today { offset_days: 0 }
    }

    pub fn tag_name(&self) -> &'static str {
        match self {
            DynamicValue::CurrentUser => "UserID",
            DynamicValue::Today { .. } => "Today",
            DynamicValue::Now => "Now",
        }
    }

    /// Whether the sentinel can stand in for a value of the given type.
    pub fn accepts(&self, value_type: ValueType) -> bool {
        match self {
            DynamicValue::CurrentUser => {
                matches!(value_type, ValueType::Integer | ValueType::Lookup)
            }
            DynamicValue::Today { .. } | DynamicValue::Now => value_type == ValueType::DateTime,
        }
    }
}

/// A raw value supplied by the caller, either inline or through a parameter map.
#[derive(Clone)]
pub enum ParamValue {
    Null,
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    ModerationStatus(ModerationStatus),
    Dynamic(DynamicValue),
    List(Vec<ParamValue>),
    /// An opaque caller object; only usable through a binding's converter.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl ParamValue {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        ParamValue::Custom(Arc::new(value))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Text(_) => "text",
            ParamValue::Integer(_) => "integer",
            ParamValue::Number(_) => "number",
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Guid(_) => "guid",
            ParamValue::DateTime(_) => "date-time",
            ParamValue::ModerationStatus(_) => "moderation status",
            ParamValue::Dynamic(_) => "dynamic value",
            ParamValue::List(_) => "list",
            ParamValue::Custom(_) => "custom object",
        }
    }

    /// The value type a literal of this kind is rendered with when none is declared.
    pub fn natural_type(&self) -> ValueType {
        match self {
            ParamValue::Integer(_) => ValueType::Integer,
            ParamValue::Number(_) => ValueType::Number,
            ParamValue::Boolean(_) => ValueType::Boolean,
            ParamValue::Guid(_) => ValueType::Guid,
            ParamValue::DateTime(_) => ValueType::DateTime,
            ParamValue::ModerationStatus(_) => ValueType::ModStat,
            ParamValue::Dynamic(DynamicValue::CurrentUser) => ValueType::Integer,
            ParamValue::Dynamic(_) => ValueType::DateTime,
            ParamValue::List(items) => items
                .first()
                .map_or(ValueType::Text, ParamValue::natural_type),
            ParamValue::Null | ParamValue::Text(_) | ParamValue::Custom(_) => ValueType::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ParamValue::Custom(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("Null"),
            ParamValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            ParamValue::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            ParamValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            ParamValue::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            ParamValue::Guid(g) => f.debug_tuple("Guid").field(g).finish(),
            ParamValue::DateTime(d) => f.debug_tuple("DateTime").field(d).finish(),
            ParamValue::ModerationStatus(s) => f.debug_tuple("ModerationStatus").field(s).finish(),
            ParamValue::Dynamic(d) => f.debug_tuple("Dynamic").field(d).finish(),
            ParamValue::List(items) => f.debug_tuple("List").field(items).finish(),
            ParamValue::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParamValue::Null, ParamValue::Null) => true,
            (ParamValue::Text(a), ParamValue::Text(b)) => a == b,
            (ParamValue::Integer(a), ParamValue::Integer(b)) => a == b,
            (ParamValue::Number(a), ParamValue::Number(b)) => a == b,
            (ParamValue::Boolean(a), ParamValue::Boolean(b)) => a == b,
            (ParamValue::Guid(a), ParamValue::Guid(b)) => a == b,
            (ParamValue::DateTime(a), ParamValue::DateTime(b)) => a == b,
            (ParamValue::ModerationStatus(a), ParamValue::ModerationStatus(b)) => a == b,
            (ParamValue::Dynamic(a), ParamValue::Dynamic(b)) => a == b,
            (ParamValue::List(a), ParamValue::List(b)) => a == b,
            (ParamValue::Custom(a), ParamValue::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

impl From<Uuid> for ParamValue {
    fn from(value: Uuid) -> Self {
        ParamValue::Guid(value)
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(value: NaiveDateTime) -> Self {
        ParamValue::DateTime(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        ParamValue::DateTime(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<ModerationStatus> for ParamValue {
    fn from(value: ModerationStatus) -> Self {
        ParamValue::ModerationStatus(value)
    }
}

impl From<DynamicValue> for ParamValue {
    fn from(value: DynamicValue) -> Self {
        ParamValue::Dynamic(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl From<&serde_json::Value> for ParamValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ParamValue::Integer(i),
                None => n.as_f64().map_or(ParamValue::Null, ParamValue::Number),
            },
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Array(items) => ParamValue::List(items.iter().map(ParamValue::from).collect()),
            Value::Object(_) => ParamValue::Custom(Arc::new(value.clone())),
        }
    }
}

/// A resolved, formatted value ready to be written into markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    Text(String),
    Dynamic(DynamicValue),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_tokens() {
        assert_eq!(ValueType::from_name("URL"), Some(ValueType::Url));
        assert_eq!(ValueType::from_name("datetime"), Some(ValueType::DateTime));
        assert_eq!(ValueType::from_name("Choice"), None);
        for t in ValueType::ALL {
            assert_eq!(ValueType::from_name(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_moderation_status_parse() {
        assert_eq!(ModerationStatus::parse("2"), Some(ModerationStatus::Pending));
        assert_eq!(ModerationStatus::parse("draft"), Some(ModerationStatus::Draft));
        assert_eq!(ModerationStatus::parse("9"), None);
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(ParamValue::from(&json!(5)), ParamValue::Integer(5));
        assert_eq!(ParamValue::from(&json!(1.5)), ParamValue::Number(1.5));
        assert_eq!(
            ParamValue::from(&json!(["a", "b"])),
            ParamValue::List(vec!["a".into(), "b".into()])
        );
        let obj = ParamValue::from(&json!({ "id": 7 }));
        assert_eq!(
            obj.downcast_ref::<serde_json::Value>().and_then(|v| v["id"].as_i64()),
            Some(7)
        );
    }

    #[test]
    fn test_dynamic_accepts() {
        assert!(DynamicValue::CurrentUser.accepts(ValueType::Lookup));
        assert!(!DynamicValue::CurrentUser.accepts(ValueType::Text));
        assert!(DynamicValue::today().accepts(ValueType::DateTime));
        assert!(!DynamicValue::Now.accepts(ValueType::Integer));
    }
}
