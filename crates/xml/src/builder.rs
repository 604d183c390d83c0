//! Rebuilds an expression tree from the element events of the reader.
//!
//! A stack of frames tracks the clause context. Completed predicates are
//! pushed onto a working stack; closing a logical element pops its operands
//! off that stack and pushes the joined predicate back.

use crate::error::{CamlError, Location};
use crate::options::ParseOptions;
use crate::tags;
use camlkit_binding::format::parse_literal;
use camlkit_binding::{BindingError, DynamicValue, ParamValue, ParameterBinding, ValueType};
use camlkit_expr::{
    BinaryOperator, ClauseList, Comparison, Expression, FieldName, FieldRef, GroupByClause,
    GroupFieldRef,
    JoinOperator, LogicalOperator, Predicate, Query, SortFieldRef, UnaryOperator, ValueForm,
    ViewFieldRef,
};

/// Attributes of one element, names and unescaped values as raw bytes.
pub type OwnedAttributes = Vec<(Vec<u8>, Vec<u8>)>;

#[derive(Debug)]
enum PendingOperator {
    Unary(UnaryOperator),
    Binary(BinaryOperator),
}

impl PendingOperator {
    fn tag_name(&self) -> &'static str {
        match self {
            PendingOperator::Unary(op) => op.tag_name(),
            PendingOperator::Binary(op) => op.tag_name(),
        }
    }
}

#[derive(Debug)]
struct PendingComparison {
    op: PendingOperator,
    field: Option<FieldRef>,
    values: Vec<ParamValue>,
    /// Names read from `{{name}}` placeholders.
    parameters: Vec<String>,
    value_type: Option<ValueType>,
    include_time: bool,
    pos: usize,
}

#[derive(Debug)]
struct PendingValue {
    value_type: ValueType,
    include_time: bool,
    text: String,
    sentinel: Option<DynamicValue>,
    pos: usize,
}

enum ValueContent {
    Literal(ParamValue),
    Placeholder(String),
}

#[derive(Debug)]
enum Frame {
    Document,
    Query(Query),
    Where { base: usize },
    OrderBy(ClauseList<SortFieldRef>),
    GroupBy(GroupByClause),
    ViewFields(ClauseList<ViewFieldRef>),
    Logical { op: LogicalOperator, base: usize, pos: usize },
    Comparison(PendingComparison),
    Values,
    Value(PendingValue),
    /// An element with no children of interest (`FieldRef`, sentinels).
    Leaf,
}

impl Frame {
    fn describe(&self) -> &'static str {
        match self {
            Frame::Document => "the document root",
            Frame::Query(_) => "<Query>",
            Frame::Where { .. } => "<Where>",
            Frame::OrderBy(_) => "<OrderBy>",
            Frame::GroupBy(_) => "<GroupBy>",
            Frame::ViewFields(_) => "<ViewFields>",
            Frame::Logical { op, .. } => match op {
                LogicalOperator::And => "<And>",
                LogicalOperator::Or => "<Or>",
                LogicalOperator::Not => "<Not>",
            },
            Frame::Comparison(_) => "a comparison",
            Frame::Values => "<Values>",
            Frame::Value(_) => "<Value>",
            Frame::Leaf => "an empty element",
        }
    }

    fn holds_predicates(&self) -> bool {
        matches!(
            self,
            Frame::Document | Frame::Where { .. } | Frame::Logical { .. }
        )
    }

    fn holds_clauses(&self) -> bool {
        matches!(self, Frame::Document | Frame::Query(_))
    }
}

pub struct TreeBuilder<'a> {
    source: &'a str,
    options: ParseOptions,
    frames: Vec<Frame>,
    predicates: Vec<Predicate>,
    roots: Vec<Expression>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(source: &'a str, options: ParseOptions) -> Self {
        Self {
            source,
            options,
            frames: vec![Frame::Document],
            predicates: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn location(&self, pos: usize) -> Location {
        Location::from_pos(self.source, pos)
    }

    fn top(&self) -> &Frame {
        self.frames.last().unwrap_or(&Frame::Document)
    }

    fn check_parent(
        &self,
        name: &str,
        pos: usize,
        allowed: fn(&Frame) -> bool,
    ) -> Result<(), CamlError> {
        let parent = self.top();
        if allowed(parent) {
            Ok(())
        } else {
            Err(CamlError::structure(
                format!("<{}> is not allowed inside {}", name, parent.describe()),
                self.location(pos),
            ))
        }
    }

    /// Reads a boolean attribute. An unrecognised token is an error in strict
    /// mode and reads as absent otherwise.
    fn bool_attr(
        &self,
        attrs: &OwnedAttributes,
        name: &str,
        pos: usize,
    ) -> Result<Option<bool>, CamlError> {
        let Some(token) = get_attr_optional(attrs, name)? else {
            return Ok(None);
        };
        match tags::parse_bool_token(&token) {
            Some(value) => Ok(Some(value)),
            None if self.options.strict => Err(CamlError::InvalidBoolean {
                attribute: name.to_string(),
                token,
                location: self.location(pos),
            }),
            None => {
                log::warn!(
                    "Ignoring unrecognised boolean '{}' for attribute '{}' at {}",
                    token,
                    name,
                    self.location(pos)
                );
                Ok(None)
            }
        }
    }

    pub fn start_element(
        &mut self,
        name: &str,
        attrs: OwnedAttributes,
        pos: usize,
    ) -> Result<(), CamlError> {
        let frame = match name {
            tags::QUERY => {
                self.check_parent(name, pos, |f| matches!(f, Frame::Document))?;
                Frame::Query(Query::new())
            }
            tags::WHERE => {
                self.check_parent(name, pos, Frame::holds_clauses)?;
                Frame::Where {
                    base: self.predicates.len(),
                }
            }
            tags::ORDER_BY => {
                self.check_parent(name, pos, Frame::holds_clauses)?;
                Frame::OrderBy(ClauseList::new())
            }
            tags::GROUP_BY => {
                self.check_parent(name, pos, Frame::holds_clauses)?;
                Frame::GroupBy(GroupByClause {
                    fields: ClauseList::new(),
                    collapse: self.bool_attr(&attrs, tags::ATTR_COLLAPSE, pos)?,
                })
            }
            tags::VIEW_FIELDS => {
                self.check_parent(name, pos, |f| matches!(f, Frame::Document))?;
                Frame::ViewFields(ClauseList::new())
            }
            tags::AND | tags::OR | tags::NOT => {
                self.check_parent(name, pos, Frame::holds_predicates)?;
                let op = match name {
                    tags::AND => LogicalOperator::And,
                    tags::OR => LogicalOperator::Or,
                    _ => LogicalOperator::Not,
                };
                Frame::Logical {
                    op,
                    base: self.predicates.len(),
                    pos,
                }
            }
            tags::FIELD_REF => {
                self.start_field_ref(&attrs, pos)?;
                Frame::Leaf
            }
            tags::VALUES => {
                self.check_parent(name, pos, |f| matches!(f, Frame::Comparison(_)))?;
                Frame::Values
            }
            tags::VALUE => {
                self.check_parent(name, pos, |f| {
                    matches!(f, Frame::Comparison(_) | Frame::Values)
                })?;
                Frame::Value(self.start_value(&attrs, pos)?)
            }
            "UserID" | "Today" | "Now" => {
                self.start_sentinel(name, &attrs, pos)?;
                Frame::Leaf
            }
            other => {
                let op = self.comparison_operator(other, &attrs, pos)?;
                self.check_parent(name, pos, Frame::holds_predicates)?;
                Frame::Comparison(PendingComparison {
                    op,
                    field: None,
                    values: Vec::new(),
                    parameters: Vec::new(),
                    value_type: None,
                    include_time: false,
                    pos,
                })
            }
        };
        self.frames.push(frame);
        Ok(())
    }

    fn comparison_operator(
        &self,
        name: &str,
        attrs: &OwnedAttributes,
        pos: usize,
    ) -> Result<PendingOperator, CamlError> {
        if let Some(op) = BinaryOperator::from_tag_name(name) {
            return Ok(PendingOperator::Binary(op));
        }
        let membership = get_attr_optional(attrs, tags::ATTR_TYPE)?;
        match UnaryOperator::from_tag_name(name, membership.as_deref()) {
            Some(op) => Ok(PendingOperator::Unary(op)),
            None if name == "Membership" => Err(CamlError::structure(
                format!(
                    "unknown membership type '{}'",
                    membership.unwrap_or_default()
                ),
                self.location(pos),
            )),
            None => Err(CamlError::UnknownElement {
                name: name.to_string(),
                location: self.location(pos),
            }),
        }
    }

    fn start_field_ref(&mut self, attrs: &OwnedAttributes, pos: usize) -> Result<(), CamlError> {
        let location = self.location(pos);
        let name = get_attr_optional(attrs, tags::ATTR_NAME)?.ok_or_else(|| {
            CamlError::structure("<FieldRef> is missing its 'Name' attribute", location)
        })?;
        let ascending = self.bool_attr(attrs, tags::ATTR_ASCENDING, pos)?;
        let nullable = self.bool_attr(attrs, tags::ATTR_NULLABLE, pos)?;
        // Informational only: the value type comes from the <Value> element.
        self.bool_attr(attrs, tags::ATTR_LOOKUP_ID, pos)?;
        let parent = self.top().describe();
        let name = self.field_name(name);

        match self.frames.last_mut() {
            Some(Frame::OrderBy(list)) => {
                list.push(SortFieldRef {
                    name,
                    ascending: ascending.unwrap_or(true),
                });
            }
            Some(Frame::GroupBy(clause)) => {
                clause.fields.push(GroupFieldRef::new(name));
            }
            Some(Frame::ViewFields(list)) => {
                list.push(ViewFieldRef {
                    name,
                    nullable: nullable.unwrap_or(false),
                });
            }
            Some(Frame::Comparison(pending)) => {
                if pending.field.is_some() {
                    return Err(CamlError::structure(
                        format!("<{}> has more than one <FieldRef>", pending.op.tag_name()),
                        location,
                    ));
                }
                pending.field = Some(FieldRef::new(name));
            }
            _ => {
                return Err(CamlError::structure(
                    format!("<FieldRef> is not allowed inside {}", parent),
                    location,
                ));
            }
        }
        Ok(())
    }

    fn field_name(&self, name: String) -> FieldName {
        match placeholder_name(&name) {
            Some(parameter) if self.options.placeholders => FieldName::parameter(parameter),
            _ => FieldName::from(name),
        }
    }

    fn start_value(&self, attrs: &OwnedAttributes, pos: usize) -> Result<PendingValue, CamlError> {
        let value_type = match get_attr_optional(attrs, tags::ATTR_TYPE)? {
            Some(name) => ValueType::from_name(&name).ok_or_else(|| CamlError::UnknownValueType {
                name,
                location: self.location(pos),
            })?,
            None if self.options.strict => {
                return Err(CamlError::structure(
                    "<Value> is missing its 'Type' attribute",
                    self.location(pos),
                ));
            }
            None => ValueType::Text,
        };
        Ok(PendingValue {
            value_type,
            include_time: self
                .bool_attr(attrs, tags::ATTR_INCLUDE_TIME_VALUE, pos)?
                .unwrap_or(false),
            text: String::new(),
            sentinel: None,
            pos,
        })
    }

    fn start_sentinel(
        &mut self,
        name: &str,
        attrs: &OwnedAttributes,
        pos: usize,
    ) -> Result<(), CamlError> {
        self.check_parent(name, pos, |f| matches!(f, Frame::Value(_)))?;
        let location = self.location(pos);
        let sentinel = match name {
            "UserID" => DynamicValue::CurrentUser,
            "Now" => DynamicValue::Now,
            _ => {
                let offset_days = match get_attr_optional(attrs, tags::ATTR_OFFSET_DAYS)? {
                    Some(offset) => offset.trim().parse::<i32>().map_err(|_| {
                        CamlError::structure(format!("invalid OffsetDays '{}'", offset), location)
                    })?,
                    None => 0,
                };
                DynamicValue::Today { offset_days }
            }
        };
        if let Some(Frame::Value(pending)) = self.frames.last_mut() {
            if pending.sentinel.is_some() {
                return Err(CamlError::structure(
                    "<Value> holds more than one dynamic value",
                    location,
                ));
            }
            pending.sentinel = Some(sentinel);
        }
        Ok(())
    }

    pub fn text(&mut self, text: &str, pos: usize) -> Result<(), CamlError> {
        if let Some(Frame::Value(pending)) = self.frames.last_mut() {
            pending.text.push_str(text);
            return Ok(());
        }
        if text.trim().is_empty() {
            return Ok(());
        }
        if self.options.strict {
            return Err(CamlError::structure(
                format!("unexpected text '{}'", text.trim()),
                self.location(pos),
            ));
        }
        log::warn!(
            "Ignoring stray text '{}' at {}",
            text.trim(),
            self.location(pos)
        );
        Ok(())
    }

    pub fn end_element(&mut self, name: &str, pos: usize) -> Result<(), CamlError> {
        let frame = match self.frames.pop() {
            Some(Frame::Document) | None => {
                return Err(CamlError::structure(
                    format!("unexpected closing tag </{}>", name),
                    self.location(pos),
                ));
            }
            Some(frame) => frame,
        };

        match frame {
            Frame::Document | Frame::Leaf | Frame::Values => Ok(()),
            Frame::Query(query) => {
                self.roots.push(Expression::Query(query));
                Ok(())
            }
            Frame::Where { base } => self.end_where(base, pos),
            Frame::OrderBy(list) => {
                match self.frames.last_mut() {
                    Some(Frame::Query(query)) => {
                        query.order_by = Some(match query.order_by.take() {
                            Some(existing) => existing.concat(list, true),
                            None => list,
                        });
                    }
                    _ => self.roots.push(Expression::OrderBy(list)),
                }
                Ok(())
            }
            Frame::GroupBy(clause) => {
                match self.frames.last_mut() {
                    Some(Frame::Query(query)) => {
                        query.group_by = Some(match query.group_by.take() {
                            Some(existing) => existing.concat(clause, true),
                            None => clause,
                        });
                    }
                    _ => self.roots.push(Expression::GroupBy(clause)),
                }
                Ok(())
            }
            Frame::ViewFields(list) => {
                self.roots.push(Expression::ViewFields(list));
                Ok(())
            }
            Frame::Logical { op, base, pos } => {
                let operands = self.predicates.split_off(base);
                let predicate = join_operands(op, operands).map_err(|count| {
                    let expected = if op == LogicalOperator::Not { 1 } else { 2 };
                    CamlError::structure(
                        format!(
                            "<{}> expects {} operand(s) but has {}",
                            name, expected, count
                        ),
                        self.location(pos),
                    )
                })?;
                self.emit_predicate(predicate);
                Ok(())
            }
            Frame::Comparison(pending) => {
                let cmp = self.finish_comparison(pending)?;
                self.emit_predicate(cmp.into());
                Ok(())
            }
            Frame::Value(pending) => self.end_value(pending),
        }
    }

    fn end_where(&mut self, base: usize, pos: usize) -> Result<(), CamlError> {
        let mut operands = self.predicates.split_off(base).into_iter();
        let mut filter = operands.next();
        let extra: Vec<Predicate> = operands.collect();
        if !extra.is_empty() {
            if self.options.strict {
                return Err(CamlError::structure(
                    format!("<Where> holds {} predicates; join them", extra.len() + 1),
                    self.location(pos),
                ));
            }
            log::warn!(
                "Joining {} sibling predicates in <Where> at {} with AND",
                extra.len() + 1,
                self.location(pos)
            );
            filter = filter.map(|first| {
                extra
                    .into_iter()
                    .fold(first, |acc, p| Predicate::join(JoinOperator::And, acc, p))
            });
        }
        let Some(filter) = filter else {
            return Ok(());
        };
        match self.frames.last_mut() {
            Some(Frame::Query(query)) => {
                query.filter = Some(match query.filter.take() {
                    Some(existing) => Predicate::join(JoinOperator::And, existing, filter),
                    None => filter,
                });
            }
            _ => self.roots.push(Expression::Predicate(filter)),
        }
        Ok(())
    }

    fn emit_predicate(&mut self, predicate: Predicate) {
        if matches!(self.top(), Frame::Document) {
            self.roots.push(Expression::Predicate(predicate));
        } else {
            self.predicates.push(predicate);
        }
    }

    fn finish_comparison(&self, pending: PendingComparison) -> Result<Comparison, CamlError> {
        let location = self.location(pending.pos);
        let tag = pending.op.tag_name();
        let field = pending.field.ok_or_else(|| {
            CamlError::structure(format!("<{}> is missing its <FieldRef>", tag), location)
        })?;
        match pending.op {
            PendingOperator::Unary(op) => {
                if !pending.values.is_empty() || !pending.parameters.is_empty() {
                    return Err(CamlError::structure(
                        format!("<{}> does not take a value", tag),
                        location,
                    ));
                }
                Ok(Comparison::Unary { op, field })
            }
            PendingOperator::Binary(op) => {
                let value_type = pending.value_type.ok_or_else(|| {
                    CamlError::structure(format!("<{}> is missing its <Value>", tag), location)
                })?;
                if op.value_form() == ValueForm::Scalar && pending.values.len() > 1 {
                    return Err(CamlError::structure(
                        format!("<{}> takes a single value", tag),
                        location,
                    ));
                }
                let value = match pending.parameters.as_slice() {
                    [] => ParameterBinding::values(pending.values, value_type),
                    [name] if pending.values.is_empty() => placeholder_binding(name, value_type),
                    _ => {
                        return Err(CamlError::structure(
                            format!("<{}> mixes a placeholder with other values", tag),
                            location,
                        ));
                    }
                };
                Ok(Comparison::Binary {
                    op,
                    field,
                    value: value.with_include_time(pending.include_time),
                })
            }
        }
    }

    fn end_value(&mut self, pending: PendingValue) -> Result<(), CamlError> {
        let location = self.location(pending.pos);
        let value = match pending.sentinel {
            Some(sentinel) => {
                if !pending.text.trim().is_empty() {
                    return Err(CamlError::structure(
                        "<Value> mixes text with a dynamic value",
                        location,
                    ));
                }
                if !sentinel.accepts(pending.value_type) {
                    return Err(CamlError::InvalidValue {
                        value_type: pending.value_type,
                        text: format!("<{}/>", sentinel.tag_name()),
                        location,
                    });
                }
                ValueContent::Literal(ParamValue::Dynamic(sentinel))
            }
            None => match placeholder_name(&pending.text) {
                Some(name) if self.options.placeholders => {
                    ValueContent::Placeholder(name.to_string())
                }
                _ => ValueContent::Literal(
                    parse_literal(&pending.text, pending.value_type).ok_or_else(|| {
                        CamlError::InvalidValue {
                            value_type: pending.value_type,
                            text: pending.text.clone(),
                            location,
                        }
                    })?,
                ),
            },
        };

        let comparison = self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::Comparison(pending) => Some(pending),
            _ => None,
        });
        let Some(comparison) = comparison else {
            return Err(CamlError::structure(
                "<Value> outside of a comparison",
                location,
            ));
        };
        match comparison.value_type {
            Some(existing) if existing != pending.value_type => {
                return Err(CamlError::structure(
                    format!(
                        "<{}> mixes {} and {} values",
                        comparison.op.tag_name(),
                        existing,
                        pending.value_type
                    ),
                    location,
                ));
            }
            _ => comparison.value_type = Some(pending.value_type),
        }
        comparison.include_time |= pending.include_time;
        match value {
            ValueContent::Literal(value) => comparison.values.push(value),
            ValueContent::Placeholder(name) => comparison.parameters.push(name),
        }
        Ok(())
    }

    /// Folds every top-level clause together with AND.
    pub fn finish(self) -> Result<Expression, CamlError> {
        if self.frames.len() != 1 {
            return Err(CamlError::structure(
                format!("unexpected end of input inside {}", self.top().describe()),
                self.location(self.source.len()),
            ));
        }
        let mut result = Expression::default();
        for root in self.roots {
            result = result.and(root)?;
        }
        Ok(result)
    }
}

/// The parameter named by a `{{name}}` placeholder.
fn placeholder_name(text: &str) -> Option<&str> {
    let name = text.trim().strip_prefix("{{")?.strip_suffix("}}")?.trim();
    (!name.is_empty()).then_some(name)
}

/// A deferred slot read from a placeholder. Text supplied for it is read the
/// way the markup would spell the value, so `"5"` fills an integer slot.
fn placeholder_binding(name: &str, value_type: ValueType) -> ParameterBinding {
    let slot = format!("parameter '{}'", name);
    ParameterBinding::parameter(name, value_type).with_converter(move |raw| match raw {
        ParamValue::Text(text) => parse_literal(text, value_type).ok_or_else(|| {
            BindingError::conversion(
                slot.clone(),
                format!("'{}' is not a {} value", text, value_type),
            )
        }),
        other => Ok(other.clone()),
    })
}

/// Joins the operands of a logical element, or returns how many there were
/// when the count is wrong.
fn join_operands(op: LogicalOperator, operands: Vec<Predicate>) -> Result<Predicate, usize> {
    let count = operands.len();
    let mut iter = operands.into_iter();
    match (op, iter.next(), iter.next(), iter.next()) {
        (LogicalOperator::Not, Some(inner), None, None) => Ok(Predicate::wrap_not(inner)),
        (LogicalOperator::And, Some(a), Some(b), None) => Ok(Predicate::join(JoinOperator::And, a, b)),
        (LogicalOperator::Or, Some(a), Some(b), None) => Ok(Predicate::join(JoinOperator::Or, a, b)),
        _ => Err(count),
    }
}

pub fn get_attr_optional(attrs: &OwnedAttributes, name: &str) -> Result<Option<String>, CamlError> {
    for (key, value) in attrs {
        if key.as_slice() == name.as_bytes() {
            return Ok(Some(String::from_utf8(value.clone())?));
        }
    }
    Ok(None)
}
