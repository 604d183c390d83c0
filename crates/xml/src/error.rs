use camlkit_binding::{BindingError, ValueType};
use camlkit_expr::ExprError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

impl From<(usize, usize)> for Location {
    fn from((line, col): (usize, usize)) -> Self {
        Location { line, col }
    }
}

impl Location {
    /// Line and column of a byte offset into `source`.
    pub fn from_pos(source: &str, pos: usize) -> Self {
        let prefix = &source[..pos.min(source.len())];
        let line = prefix.matches('\n').count() + 1;
        let col = prefix.rfind('\n').map_or(pos + 1, |nl| pos - nl);
        Location { line, col }
    }
}

#[derive(Error, Debug)]
pub enum CamlError {
    #[error("Quick-XML error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    #[error("I/O error while writing markup: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 string error: {0}")]
    Utf8Str(#[from] std::str::Utf8Error),

    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Markup structure error: {message} at {location}")]
    Structure { message: String, location: Location },

    #[error("Unknown element <{name}> at {location}")]
    UnknownElement { name: String, location: Location },

    #[error("Unknown value type '{name}' at {location}")]
    UnknownValueType { name: String, location: Location },

    #[error("Invalid {value_type} value '{text}' at {location}")]
    InvalidValue {
        value_type: ValueType,
        text: String,
        location: Location,
    },

    #[error("Invalid boolean '{token}' for attribute '{attribute}' at {location}")]
    InvalidBoolean {
        attribute: String,
        token: String,
        location: Location,
    },

    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl CamlError {
    pub fn structure(message: impl Into<String>, location: Location) -> Self {
        CamlError::Structure {
            message: message.into(),
            location,
        }
    }

    /// Where in the source the error was detected, for markup errors.
    pub fn location(&self) -> Option<Location> {
        match self {
            CamlError::Structure { location, .. }
            | CamlError::UnknownElement { location, .. }
            | CamlError::UnknownValueType { location, .. }
            | CamlError::InvalidValue { location, .. }
            | CamlError::InvalidBoolean { location, .. } => Some(*location),
            _ => None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for CamlError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        CamlError::QuickXml(quick_xml::Error::InvalidAttr(e))
    }
}

impl From<quick_xml::escape::EscapeError> for CamlError {
    fn from(e: quick_xml::escape::EscapeError) -> Self {
        CamlError::QuickXml(quick_xml::Error::Escape(e))
    }
}
