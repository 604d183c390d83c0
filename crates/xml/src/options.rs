/// Controls how an expression is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Indent nested elements, one per line.
    pub pretty: bool,
    /// Spaces per nesting level when `pretty` is set.
    pub indent: usize,
    /// Wrap a bare predicate in `<Where>`. Turn off to embed the output in a
    /// filter clause built elsewhere.
    pub wrap_predicate_in_where: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: 2,
            wrap_predicate_in_where: true,
        }
    }
}

impl RenderOptions {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_wrap_predicate_in_where(mut self, wrap: bool) -> Self {
        self.wrap_predicate_in_where = wrap;
        self
    }
}

/// Controls how forgiving the parser is.
///
/// Unknown elements, operators and value types are rejected in either mode.
/// Lenient mode additionally accepts unrecognised boolean attribute tokens
/// (falling back to the attribute's default), stray text between elements,
/// and several predicates in one `<Where>` (joined with AND).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub strict: bool,
    /// Read `{{name}}` as a deferred parameter, both as value text and as a
    /// `FieldRef` name. Off by default, so such text stays literal.
    pub placeholders: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_placeholders(mut self, placeholders: bool) -> Self {
        self.placeholders = placeholders;
        self
    }
}
