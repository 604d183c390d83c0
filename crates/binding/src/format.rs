//! Type-specific text formatting of parameter values, and the inverse parsing
//! used when values are read back from markup.

use crate::value::{BoundValue, ModerationStatus, ParamValue, ValueType};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const TRUE_TOKEN: &str = "1";
pub const FALSE_TOKEN: &str = "0";

pub fn format_boolean(value: bool) -> &'static str {
    if value { TRUE_TOKEN } else { FALSE_TOKEN }
}

/// Accepts the rendered tokens as well as the usual spellings of true/false.
pub fn parse_boolean(text: &str) -> Option<bool> {
    match text.trim() {
        "1" => Some(true),
        "0" => Some(false),
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

pub fn format_date_time(value: &NaiveDateTime, include_time: bool) -> String {
    if include_time {
        value.format(DATE_TIME_FORMAT).to_string()
    } else {
        value.format(DATE_FORMAT).to_string()
    }
}

pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// `0x` followed by an even, non-zero number of hex digits.
pub fn is_content_type_id(text: &str) -> bool {
    let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) else {
        return false;
    };
    !digits.is_empty() && digits.len() % 2 == 0 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Formats a single, non-null, non-list value for the declared type.
///
/// Returns `None` when the value's kind does not fit the type.
pub fn format_value(
    value: &ParamValue,
    value_type: ValueType,
    include_time: bool,
) -> Option<BoundValue> {
    if let ParamValue::Dynamic(dynamic) = value {
        return dynamic.accepts(value_type).then_some(BoundValue::Dynamic(*dynamic));
    }
    let text = match (value_type, value) {
        (ValueType::Text | ValueType::Url, ParamValue::Text(s)) => s.clone(),
        (ValueType::ContentTypeId, ParamValue::Text(s)) if is_content_type_id(s) => {
            s.to_ascii_uppercase().replacen("0X", "0x", 1)
        }
        (ValueType::Integer | ValueType::Lookup, ParamValue::Integer(i)) => i.to_string(),
        (ValueType::Number, ParamValue::Number(n)) if n.is_finite() => n.to_string(),
        (ValueType::Number, ParamValue::Integer(i)) => i.to_string(),
        (ValueType::Boolean, ParamValue::Boolean(b)) => format_boolean(*b).to_string(),
        (ValueType::Guid, ParamValue::Guid(g)) => g.to_string(),
        (ValueType::Guid, ParamValue::Text(s)) => Uuid::parse_str(s.trim()).ok()?.to_string(),
        (ValueType::DateTime, ParamValue::DateTime(dt)) => format_date_time(dt, include_time),
        (ValueType::ModStat, ParamValue::ModerationStatus(s)) => s.code().to_string(),
        (ValueType::ModStat, ParamValue::Integer(i)) => {
            ModerationStatus::from_code(*i)?.code().to_string()
        }
        _ => return None,
    };
    Some(BoundValue::Text(text))
}

/// Reads the text content of a value element back into a raw value.
pub fn parse_literal(text: &str, value_type: ValueType) -> Option<ParamValue> {
    match value_type {
        ValueType::Text | ValueType::Url => Some(ParamValue::Text(text.to_string())),
        ValueType::ContentTypeId => {
            is_content_type_id(text.trim()).then(|| ParamValue::Text(text.trim().to_string()))
        }
        ValueType::Integer | ValueType::Lookup => {
            text.trim().parse::<i64>().ok().map(ParamValue::Integer)
        }
        ValueType::Number => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(ParamValue::Number),
        ValueType::Boolean => parse_boolean(text).map(ParamValue::Boolean),
        ValueType::Guid => Uuid::parse_str(text.trim()).ok().map(ParamValue::Guid),
        ValueType::DateTime => parse_date_time(text).map(ParamValue::DateTime),
        ValueType::ModStat => ModerationStatus::parse(text).map(ParamValue::ModerationStatus),
    }
}
