//! Depth-first emission of CAML markup.

use crate::error::CamlError;
use crate::options::RenderOptions;
use crate::tags;
use camlkit_binding::{BoundValue, DynamicValue, Layered, ParameterBinding, ParameterSource, ValueType};
use camlkit_expr::{
    BinaryOperator, ClauseList, Comparison, EmptyMarker, Expression, FieldName, FieldRef,
    GroupByClause, JoinOperator, LogicalJoin, Predicate, Query, SortFieldRef, UnaryOperator,
    ValueForm, ViewFieldRef,
};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::cell::RefCell;

thread_local! {
    static LAST_RENDERED: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// The text most recently produced by [`render`] on this thread.
pub fn last_rendered() -> Option<String> {
    LAST_RENDERED.with(|slot| slot.borrow().clone())
}

/// Renders `expr`, resolving deferred values against `params`. Values carried
/// by a binding envelope shadow those in `params`.
pub fn render(
    expr: &Expression,
    params: &dyn ParameterSource,
    options: &RenderOptions,
) -> Result<String, CamlError> {
    let output = render_node(expr, params, options)?;
    log::debug!(
        "Rendered {} node to {} bytes of CAML",
        expr.kind(),
        output.len()
    );
    LAST_RENDERED.with(|slot| *slot.borrow_mut() = Some(output.clone()));
    Ok(output)
}

fn render_node(
    expr: &Expression,
    params: &dyn ParameterSource,
    options: &RenderOptions,
) -> Result<String, CamlError> {
    if let Expression::Bound(env) = expr {
        let layered = Layered::new(env.params(), params);
        return render_node(env.inner(), &layered, options);
    }
    let mut writer = CamlWriter::new(params, options);
    writer.write_root(expr)?;
    writer.finish()
}

struct CamlWriter<'a> {
    writer: Writer<Vec<u8>>,
    params: &'a dyn ParameterSource,
    options: &'a RenderOptions,
}

impl<'a> CamlWriter<'a> {
    fn new(params: &'a dyn ParameterSource, options: &'a RenderOptions) -> Self {
        let writer = if options.pretty {
            Writer::new_with_indent(Vec::new(), b' ', options.indent)
        } else {
            Writer::new(Vec::new())
        };
        Self {
            writer,
            params,
            options,
        }
    }

    fn finish(self) -> Result<String, CamlError> {
        Ok(String::from_utf8(self.writer.into_inner())?)
    }

    fn start(&mut self, element: BytesStart<'_>) -> Result<(), CamlError> {
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), CamlError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, element: BytesStart<'_>) -> Result<(), CamlError> {
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), CamlError> {
        if !text.is_empty() {
            self.writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        Ok(())
    }

    fn write_root(&mut self, expr: &Expression) -> Result<(), CamlError> {
        match expr {
            Expression::Empty(EmptyMarker::Neutral | EmptyMarker::True) => Ok(()),
            Expression::Empty(EmptyMarker::False) => self.write_filter(&Predicate::always_false()),
            Expression::Predicate(p) => self.write_filter(p),
            Expression::ViewField(f) => self.write_view_fields(&ClauseList::single(f.clone())),
            Expression::ViewFields(list) => self.write_view_fields(list),
            Expression::SortField(f) => self.write_order_by(&ClauseList::single(f.clone())),
            Expression::OrderBy(list) => self.write_order_by(list),
            Expression::GroupField(f) => {
                self.write_group_by(&GroupByClause::new(ClauseList::single(f.clone())))
            }
            Expression::GroupBy(clause) => self.write_group_by(clause),
            Expression::Query(q) => self.write_query(q),
            // Envelopes never nest and `render_node` unwraps the outer one.
            Expression::Bound(env) => self.write_root(env.inner()),
        }
    }

    fn write_filter(&mut self, predicate: &Predicate) -> Result<(), CamlError> {
        if !self.options.wrap_predicate_in_where {
            return self.write_predicate(predicate);
        }
        self.write_where(predicate)
    }

    fn write_where(&mut self, predicate: &Predicate) -> Result<(), CamlError> {
        self.start(BytesStart::new(tags::WHERE))?;
        self.write_predicate(predicate)?;
        self.end(tags::WHERE)
    }

    fn write_query(&mut self, query: &Query) -> Result<(), CamlError> {
        self.start(BytesStart::new(tags::QUERY))?;
        if let Some(filter) = &query.filter {
            self.write_where(filter)?;
        }
        if let Some(order_by) = &query.order_by {
            self.write_order_by(order_by)?;
        }
        if let Some(group_by) = &query.group_by {
            self.write_group_by(group_by)?;
        }
        self.end(tags::QUERY)
    }

    fn write_predicate(&mut self, predicate: &Predicate) -> Result<(), CamlError> {
        match predicate {
            Predicate::Comparison(cmp) => self.write_comparison(cmp),
            Predicate::Logical(join) => {
                let tag = join.tag_name();
                self.start(BytesStart::new(tag))?;
                match join {
                    LogicalJoin::And(a, b) | LogicalJoin::Or(a, b) => {
                        self.write_predicate(a)?;
                        self.write_predicate(b)?;
                    }
                    LogicalJoin::Not(inner) => self.write_predicate(inner)?,
                }
                self.end(tag)
            }
        }
    }

    fn write_comparison(&mut self, cmp: &Comparison) -> Result<(), CamlError> {
        match cmp {
            Comparison::Unary { op, field } => {
                let mut element = BytesStart::new(op.tag_name());
                if let UnaryOperator::Membership(kind) = op {
                    element.push_attribute((tags::ATTR_TYPE, kind.as_str()));
                }
                self.start(element)?;
                self.write_filter_field(field, false)?;
                self.end(op.tag_name())
            }
            Comparison::Binary { op, field, value } => match op.value_form() {
                ValueForm::Scalar => {
                    let bound = value.bind_one(self.params)?;
                    self.write_binary(*op, field, value, std::slice::from_ref(&bound))
                }
                ValueForm::List => {
                    let bound = value.bind_many(self.params)?;
                    self.write_binary(*op, field, value, &bound)
                }
                ValueForm::Expanded(join) => {
                    let bound = value.bind_many(self.params)?;
                    self.write_expanded(*op, join, field, value, &bound)
                }
            },
        }
    }

    /// One comparison per value, nested so that `[a, b, c]` becomes
    /// `join(a, join(b, c))`.
    fn write_expanded(
        &mut self,
        op: BinaryOperator,
        join: JoinOperator,
        field: &FieldRef,
        binding: &ParameterBinding,
        values: &[BoundValue],
    ) -> Result<(), CamlError> {
        match values {
            [] | [_] => self.write_binary(op, field, binding, values),
            [first, rest @ ..] => {
                self.start(BytesStart::new(join.tag_name()))?;
                self.write_binary(op, field, binding, std::slice::from_ref(first))?;
                self.write_expanded(op, join, field, binding, rest)?;
                self.end(join.tag_name())
            }
        }
    }

    fn write_binary(
        &mut self,
        op: BinaryOperator,
        field: &FieldRef,
        binding: &ParameterBinding,
        values: &[BoundValue],
    ) -> Result<(), CamlError> {
        self.start(BytesStart::new(op.tag_name()))?;
        self.write_filter_field(field, binding.value_type() == ValueType::Lookup)?;
        if op == BinaryOperator::In || values.len() > 1 {
            self.start(BytesStart::new(tags::VALUES))?;
            for value in values {
                self.write_value(binding, value)?;
            }
            self.end(tags::VALUES)?;
        } else {
            for value in values {
                self.write_value(binding, value)?;
            }
        }
        self.end(op.tag_name())
    }

    fn write_value(&mut self, binding: &ParameterBinding, value: &BoundValue) -> Result<(), CamlError> {
        let mut element = BytesStart::new(tags::VALUE);
        element.push_attribute((tags::ATTR_TYPE, binding.value_type().as_str()));
        if binding.include_time() {
            element.push_attribute((tags::ATTR_INCLUDE_TIME_VALUE, tags::TRUE_TOKEN));
        }
        match value {
            // Indentation inside an open element would read back as text.
            BoundValue::Text(text) if text.is_empty() => self.empty(element),
            BoundValue::Text(text) => {
                self.start(element)?;
                self.text(text)?;
                self.end(tags::VALUE)
            }
            BoundValue::Dynamic(dynamic) => {
                self.start(element)?;
                self.write_sentinel(dynamic)?;
                self.end(tags::VALUE)
            }
        }
    }

    fn write_sentinel(&mut self, dynamic: &DynamicValue) -> Result<(), CamlError> {
        let mut element = BytesStart::new(dynamic.tag_name());
        if let DynamicValue::Today { offset_days } = dynamic
            && *offset_days != 0
        {
            element.push_attribute((tags::ATTR_OFFSET_DAYS, offset_days.to_string().as_str()));
        }
        self.empty(element)
    }

    fn field_name(&self, name: &FieldName) -> Result<String, CamlError> {
        Ok(name.resolve(self.params)?)
    }

    fn write_filter_field(&mut self, field: &FieldRef, lookup_id: bool) -> Result<(), CamlError> {
        let name = self.field_name(&field.name)?;
        let mut element = BytesStart::new(tags::FIELD_REF);
        element.push_attribute((tags::ATTR_NAME, name.as_str()));
        if lookup_id {
            element.push_attribute((tags::ATTR_LOOKUP_ID, tags::TRUE_TOKEN));
        }
        self.empty(element)
    }

    fn write_view_fields(&mut self, list: &ClauseList<ViewFieldRef>) -> Result<(), CamlError> {
        self.start(BytesStart::new(tags::VIEW_FIELDS))?;
        for field in list.iter() {
            let name = self.field_name(&field.name)?;
            let mut element = BytesStart::new(tags::FIELD_REF);
            element.push_attribute((tags::ATTR_NAME, name.as_str()));
            if field.nullable {
                element.push_attribute((tags::ATTR_NULLABLE, tags::TRUE_TOKEN));
            }
            self.empty(element)?;
        }
        self.end(tags::VIEW_FIELDS)
    }

    fn write_order_by(&mut self, list: &ClauseList<SortFieldRef>) -> Result<(), CamlError> {
        self.start(BytesStart::new(tags::ORDER_BY))?;
        for field in list.iter() {
            let name = self.field_name(&field.name)?;
            let mut element = BytesStart::new(tags::FIELD_REF);
            element.push_attribute((tags::ATTR_NAME, name.as_str()));
            element.push_attribute((tags::ATTR_ASCENDING, tags::bool_token(field.ascending)));
            self.empty(element)?;
        }
        self.end(tags::ORDER_BY)
    }

    fn write_group_by(&mut self, clause: &GroupByClause) -> Result<(), CamlError> {
        let mut element = BytesStart::new(tags::GROUP_BY);
        if let Some(collapse) = clause.collapse {
            element.push_attribute((tags::ATTR_COLLAPSE, tags::bool_token(collapse)));
        }
        self.start(element)?;
        for field in clause.fields.iter() {
            let name = self.field_name(&field.name)?;
            let mut element = BytesStart::new(tags::FIELD_REF);
            element.push_attribute((tags::ATTR_NAME, name.as_str()));
            self.empty(element)?;
        }
        self.end(tags::GROUP_BY)
    }
}
