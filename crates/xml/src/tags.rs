//! Element and attribute names of the CAML dialect.

pub const QUERY: &str = "Query";
pub const WHERE: &str = "Where";
pub const ORDER_BY: &str = "OrderBy";
pub const GROUP_BY: &str = "GroupBy";
pub const VIEW_FIELDS: &str = "ViewFields";
pub const FIELD_REF: &str = "FieldRef";
pub const VALUE: &str = "Value";
pub const VALUES: &str = "Values";
pub const AND: &str = "And";
pub const OR: &str = "Or";
pub const NOT: &str = "Not";

pub const ATTR_NAME: &str = "Name";
pub const ATTR_TYPE: &str = "Type";
pub const ATTR_ASCENDING: &str = "Ascending";
pub const ATTR_NULLABLE: &str = "Nullable";
pub const ATTR_LOOKUP_ID: &str = "LookupId";
pub const ATTR_COLLAPSE: &str = "Collapse";
pub const ATTR_INCLUDE_TIME_VALUE: &str = "IncludeTimeValue";
pub const ATTR_OFFSET_DAYS: &str = "OffsetDays";

pub const TRUE_TOKEN: &str = "TRUE";
pub const FALSE_TOKEN: &str = "FALSE";

pub fn bool_token(value: bool) -> &'static str {
    if value { TRUE_TOKEN } else { FALSE_TOKEN }
}

/// Reads a boolean attribute value. Case-insensitive, `1`/`0` accepted.
pub fn parse_bool_token(token: &str) -> Option<bool> {
    match token.trim() {
        "1" => Some(true),
        "0" => Some(false),
        t if t.eq_ignore_ascii_case(TRUE_TOKEN) => Some(true),
        t if t.eq_ignore_ascii_case(FALSE_TOKEN) => Some(false),
        _ => None,
    }
}
