//! Streaming CAML reader.

use crate::builder::{OwnedAttributes, TreeBuilder};
use crate::error::{CamlError, Location};
use crate::options::ParseOptions;
use camlkit_expr::Expression;
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

/// Parses CAML markup leniently. Blank input yields the neutral expression.
pub fn parse(source: &str) -> Result<Expression, CamlError> {
    parse_with(source, &ParseOptions::default())
}

pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Expression, CamlError> {
    let mut builder = TreeBuilder::new(source, *options);
    drive(source, &mut builder)?;
    let expr = builder.finish()?;
    log::debug!(
        "Parsed {} bytes of CAML into a {} node",
        source.len(),
        expr.kind()
    );
    Ok(expr)
}

fn drive(source: &str, builder: &mut TreeBuilder<'_>) -> Result<(), CamlError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    loop {
        let pos = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = element_name(&e)?;
                builder.start_element(&name, owned_attributes(&e)?, pos)?;
            }
            Event::Empty(e) => {
                let name = element_name(&e)?;
                builder.start_element(&name, owned_attributes(&e)?, pos)?;
                builder.end_element(&name, pos)?;
            }
            Event::End(e) => {
                let name = std::str::from_utf8(e.name().as_ref())?.to_string();
                builder.end_element(&name, pos)?;
            }
            Event::Text(e) => {
                let raw_text = std::str::from_utf8(&e)?;
                builder.text(&unescape(raw_text)?, pos)?;
            }
            Event::CData(e) => {
                builder.text(std::str::from_utf8(&e)?, pos)?;
            }
            Event::GeneralRef(e) => {
                let entity = std::str::from_utf8(&e)?;
                let text = resolve_reference(entity).ok_or_else(|| {
                    CamlError::structure(
                        format!("unknown entity '&{};'", entity),
                        Location::from_pos(source, pos),
                    )
                })?;
                builder.text(&text, pos)?;
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }

    Ok(())
}

fn element_name(e: &BytesStart<'_>) -> Result<String, CamlError> {
    Ok(std::str::from_utf8(e.name().as_ref())?.to_string())
}

fn owned_attributes(e: &BytesStart<'_>) -> Result<OwnedAttributes, CamlError> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let raw = std::str::from_utf8(&attr.value)?;
        let value = unescape(raw)?;
        attributes.push((attr.key.as_ref().to_vec(), value.as_bytes().to_vec()));
    }
    Ok(attributes)
}

/// Character references and the predefined XML entities.
fn resolve_reference(entity: &str) -> Option<String> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_predefined_entity(entity).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camlkit_binding::{DynamicValue, ParamValue, ParameterBinding, ValueType};
    use camlkit_expr::{
        BinaryOperator, Comparison, EmptyMarker, NodeKind, Predicate, SortFieldRef, caml,
    };

    fn eq_text(field: &str, value: &str) -> Expression {
        caml::eq(field, ParameterBinding::text(value))
    }

    #[test]
    fn test_blank_input_is_neutral() {
        assert_eq!(parse("").unwrap(), Expression::Empty(EmptyMarker::Neutral));
        assert_eq!(parse("  \n ").unwrap(), Expression::Empty(EmptyMarker::Neutral));
        assert_eq!(parse("<Where/>").unwrap(), Expression::Empty(EmptyMarker::Neutral));
    }

    #[test]
    fn test_parse_simple_where() {
        let expr = parse(
            r#"<Where><Eq><FieldRef Name="Status"/><Value Type="Text">Active</Value></Eq></Where>"#,
        )
        .unwrap();
        assert_eq!(expr, eq_text("Status", "Active"));
    }

    #[test]
    fn test_parse_nested_logical() {
        let source = r#"
            <Where>
              <And>
                <Eq><FieldRef Name="Status"/><Value Type="Text">Active</Value></Eq>
                <Not>
                  <IsNull><FieldRef Name="Owner"/></IsNull>
                </Not>
              </And>
            </Where>"#;
        let expr = parse(source).unwrap();
        let Expression::Predicate(Predicate::Logical(join)) = &expr else {
            panic!("expected a logical predicate, got {:?}", expr);
        };
        assert_eq!(join.tag_name(), "And");
    }

    #[test]
    fn test_parse_query_with_all_clauses() {
        let source = r#"<Query><Where><Gt><FieldRef Name="Score"/><Value Type="Integer">50</Value></Gt></Where><OrderBy><FieldRef Name="Created" Ascending="FALSE"/></OrderBy><GroupBy Collapse="TRUE"><FieldRef Name="Team"/></GroupBy></Query>"#;
        let Expression::Query(query) = parse(source).unwrap() else {
            panic!("expected a query");
        };
        let Some(Predicate::Comparison(Comparison::Binary { op, value, .. })) = &query.filter
        else {
            panic!("expected a comparison filter");
        };
        assert_eq!(*op, BinaryOperator::Gt);
        assert_eq!(value.value_type(), ValueType::Integer);
        let order_by = query.order_by.expect("order by");
        let first: Vec<&SortFieldRef> = order_by.iter().collect();
        assert!(!first[0].ascending);
        assert_eq!(query.group_by.and_then(|g| g.collapse), Some(true));
    }

    #[test]
    fn test_single_field_lists_stay_lists() {
        let expr = parse(r#"<ViewFields><FieldRef Name="Title"/></ViewFields>"#).unwrap();
        assert_eq!(expr.kind(), NodeKind::ViewFields);
    }

    #[test]
    fn test_sibling_clauses_fold_into_query() {
        let source = r#"<Where><IsNotNull><FieldRef Name="Title"/></IsNotNull></Where><OrderBy><FieldRef Name="Title"/></OrderBy>"#;
        assert_eq!(parse(source).unwrap().kind(), NodeKind::Query);
    }

    #[test]
    fn test_sentinel_values() {
        let source = r#"<Where><Geq><FieldRef Name="Due"/><Value Type="DateTime"><Today OffsetDays="-3"/></Value></Geq></Where>"#;
        let Expression::Predicate(Predicate::Comparison(Comparison::Binary { value, .. })) =
            parse(source).unwrap()
        else {
            panic!("expected a comparison");
        };
        assert_eq!(
            value.source(),
            &camlkit_binding::BindingSource::Values(vec![ParamValue::Dynamic(
                DynamicValue::Today { offset_days: -3 }
            )])
        );
    }

    #[test]
    fn test_entities_in_values() {
        let expr = parse(
            r#"<Where><Eq><FieldRef Name="Title"/><Value Type="Text">R&amp;D &#x41;</Value></Eq></Where>"#,
        )
        .unwrap();
        assert_eq!(expr, eq_text("Title", "R&D A"));
    }

    #[test]
    fn test_unknown_element_is_rejected() {
        let err = parse(r#"<Where><Like><FieldRef Name="X"/></Like></Where>"#).unwrap_err();
        assert!(matches!(err, CamlError::UnknownElement { ref name, .. } if name == "Like"));
        assert_eq!(err.location().map(|l| l.line), Some(1));
    }

    #[test]
    fn test_unknown_value_type_is_rejected() {
        let err = parse(
            r#"<Where><Eq><FieldRef Name="X"/><Value Type="Money">1</Value></Eq></Where>"#,
        )
        .unwrap_err();
        assert!(matches!(err, CamlError::UnknownValueType { .. }));
    }

    #[test]
    fn test_invalid_literal_is_rejected() {
        let err = parse(
            r#"<Where><Eq><FieldRef Name="X"/><Value Type="Integer">ten</Value></Eq></Where>"#,
        )
        .unwrap_err();
        assert!(matches!(err, CamlError::InvalidValue { .. }));
    }

    #[test]
    fn test_logical_arity_is_checked() {
        let err = parse(
            r#"<Where><And><IsNull><FieldRef Name="X"/></IsNull></And></Where>"#,
        )
        .unwrap_err();
        assert!(matches!(err, CamlError::Structure { .. }));
    }

    #[test]
    fn test_misplaced_element_is_rejected() {
        let err = parse(r#"<OrderBy><Eq><FieldRef Name="X"/></Eq></OrderBy>"#).unwrap_err();
        assert!(matches!(err, CamlError::Structure { .. }));
    }

    #[test]
    fn test_strict_and_lenient_differ() {
        let crowded = r#"<Where><IsNull><FieldRef Name="A"/></IsNull><IsNull><FieldRef Name="B"/></IsNull></Where>"#;
        assert!(parse_with(crowded, &ParseOptions::strict()).is_err());
        assert_eq!(parse(crowded).unwrap().kind(), NodeKind::Logical);

        let bad_bool = r#"<OrderBy><FieldRef Name="A" Ascending="maybe"/></OrderBy>"#;
        assert!(matches!(
            parse_with(bad_bool, &ParseOptions::strict()),
            Err(CamlError::InvalidBoolean { .. })
        ));
        let Expression::OrderBy(list) = parse(bad_bool).unwrap() else {
            panic!("expected an order by list");
        };
        assert!(list.iter().all(|f| f.ascending));

        let untyped = r#"<Where><Eq><FieldRef Name="A"/><Value>x</Value></Eq></Where>"#;
        assert!(parse_with(untyped, &ParseOptions::strict()).is_err());
        assert_eq!(parse(untyped).unwrap(), eq_text("A", "x"));
    }

    #[test]
    fn test_membership_requires_type() {
        let ok = parse(r#"<Where><Membership Type="SPWeb.Groups"><FieldRef Name="AssignedTo"/></Membership></Where>"#);
        assert!(ok.is_ok());
        let missing = parse(r#"<Where><Membership><FieldRef Name="AssignedTo"/></Membership></Where>"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_self_closing_value_is_empty_text() {
        let expr = parse(r#"<Where><Eq><FieldRef Name="Title"/><Value Type="Text"/></Eq></Where>"#)
            .unwrap();
        assert_eq!(expr, eq_text("Title", ""));
    }

    #[test]
    fn test_placeholders_become_parameters() {
        let markup = r#"<Where><And><Eq><FieldRef Name="{{field}}"/><Value Type="Text">{{status}}</Value></Eq><Gt><FieldRef Name="Score"/><Value Type="Integer"> {{ min }} </Value></Gt></And></Where>"#;
        let options = ParseOptions::default().with_placeholders(true);
        let expr = parse_with(markup, &options).unwrap();
        let names: Vec<String> = expr.parameter_names().into_iter().collect();
        assert_eq!(names, vec!["field", "min", "status"]);

        let mut params = camlkit_binding::ParameterMap::new();
        params.insert("field".into(), ParamValue::from("Status"));
        params.insert("status".into(), ParamValue::from("Active"));
        params.insert("min".into(), ParamValue::from("50"));
        let resolved = expr.resolve(&params).unwrap();
        let expected = (eq_text("Status", "Active") & caml::gt("Score", 50)).unwrap();
        assert_eq!(resolved, expected);

        let mut wrong = params.clone();
        wrong.insert("min".into(), ParamValue::from("lots"));
        assert!(matches!(
            expr.resolve(&wrong),
            Err(camlkit_binding::BindingError::Conversion { .. })
        ));
    }

    #[test]
    fn test_placeholders_stay_literal_by_default() {
        let markup = r#"<Where><Eq><FieldRef Name="Title"/><Value Type="Text">{{status}}</Value></Eq></Where>"#;
        assert_eq!(parse(markup).unwrap(), eq_text("Title", "{{status}}"));
        assert!(parse(markup).unwrap().parameter_names().is_empty());
    }

    #[test]
    fn test_placeholder_cannot_mix_with_values() {
        let markup = r#"<Where><In><FieldRef Name="ID"/><Values><Value Type="Integer">1</Value><Value Type="Integer">{{ids}}</Value></Values></In></Where>"#;
        let options = ParseOptions::default().with_placeholders(true);
        assert!(matches!(
            parse_with(markup, &options),
            Err(CamlError::Structure { .. })
        ));
    }
}
