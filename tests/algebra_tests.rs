mod common;

use camlkit::{BinaryOperator, Expression, ExprError, LogicalOperator, NodeKind, caml, parse};
use camlkit::expr::{Comparison, FieldRef, Predicate, UnaryOperator};
use camlkit::ParameterBinding;
use common::{TestResult, init_logger, render};

fn leaves() -> Vec<Expression> {
    vec![
        caml::eq("Status", "Active"),
        caml::gt("Score", 50),
        (caml::is_null("Owner") | caml::contains("Title", "x")).unwrap(),
    ]
}

#[test]
fn test_identity_laws() -> TestResult {
    init_logger();
    for x in leaves() {
        assert_eq!((caml::empty() & x.clone())?, x);
        assert_eq!((x.clone() | caml::empty())?, x);
        assert_eq!((caml::always() & x.clone())?, x);
        assert_eq!((x.clone() | caml::always())?, caml::always());
        assert_eq!((caml::never() & x.clone())?, caml::never());
        assert_eq!((caml::never() | x.clone())?, x);
    }
    assert_eq!((caml::empty() & caml::never())?, caml::never());
    assert_eq!((caml::always() | caml::empty())?, caml::always());
    Ok(())
}

#[test]
fn test_operand_order_is_preserved() -> TestResult {
    let a = caml::eq("A", 1);
    let b = caml::eq("B", 2);
    let ab = render(&(a.clone() & b.clone())?);
    let ba = render(&(b & a)?);
    assert_ne!(ab, ba);
    assert!(ab.find(r#"Name="A""#) < ab.find(r#"Name="B""#));
    Ok(())
}

#[test]
fn test_de_morgan() -> TestResult {
    init_logger();
    let [a, b, c] = <[Expression; 3]>::try_from(leaves()).unwrap();

    let negated_and = (!(a.clone() & b.clone())?)?;
    let or_of_negations = ((!a.clone())? | (!b.clone())?)?;
    assert_eq!(render(&negated_and), render(&or_of_negations));

    let negated_or = (!(b.clone() | c.clone())?)?;
    let and_of_negations = ((!b)? & (!c)?)?;
    assert_eq!(render(&negated_or), render(&and_of_negations));

    let double = (!(!a.clone())?)?;
    assert_eq!(double, a);
    Ok(())
}

#[test]
fn test_operator_inverse_closure() -> TestResult {
    let binary = [
        BinaryOperator::Eq,
        BinaryOperator::Neq,
        BinaryOperator::Gt,
        BinaryOperator::Geq,
        BinaryOperator::Lt,
        BinaryOperator::Leq,
        BinaryOperator::Includes,
        BinaryOperator::NotIncludes,
    ];
    for op in binary {
        let inverse = op.inverse().expect("operator has an inverse");
        let cmp: Expression = Predicate::from(Comparison::binary(
            op,
            FieldRef::new("F"),
            ParameterBinding::integer(1),
        ))
        .into();
        let negated = (!cmp.clone())?;
        let Expression::Predicate(Predicate::Comparison(flipped)) = &negated else {
            panic!("{:?} should negate to a single comparison", op);
        };
        assert_eq!(flipped.tag_name(), inverse.tag_name());
        assert_eq!((!negated)?, cmp);
    }

    for op in [UnaryOperator::IsNull, UnaryOperator::IsNotNull] {
        let cmp: Expression = Predicate::from(Comparison::unary(op, "F")).into();
        let negated = (!cmp.clone())?;
        assert_eq!(negated.kind(), NodeKind::Comparison);
        assert_eq!((!negated)?, cmp);
    }

    for expr in [caml::begins_with("F", "x"), caml::contains("F", "x"), caml::in_values("F", vec![1])] {
        assert_eq!((!expr)?.kind(), NodeKind::Logical);
    }
    Ok(())
}

#[test]
fn test_multi_value_expansion_nests_right() -> TestResult {
    let markup = render(&caml::contains("Title", vec!["a", "b", "c"]));
    let expected = concat!(
        r#"<Where><Or>"#,
        r#"<Contains><FieldRef Name="Title"/><Value Type="Text">a</Value></Contains>"#,
        r#"<Or>"#,
        r#"<Contains><FieldRef Name="Title"/><Value Type="Text">b</Value></Contains>"#,
        r#"<Contains><FieldRef Name="Title"/><Value Type="Text">c</Value></Contains>"#,
        r#"</Or></Or></Where>"#
    );
    assert_eq!(markup, expected);

    let contains = |value: &str| caml::contains("Title", value);
    let nested = (contains("a") | (contains("b") | contains("c"))?)?;
    assert_eq!(parse(&markup)?, nested);
    assert_eq!(render(&nested), markup);
    Ok(())
}

#[test]
fn test_clause_lists_deduplicate_and_keep_order() -> TestResult {
    let expr = (caml::order_by("Title") & caml::order_by_desc("Created") & caml::order_by_desc("Title"))?;
    assert_eq!(
        render(&expr),
        r#"<OrderBy><FieldRef Name="Title" Ascending="TRUE"/><FieldRef Name="Created" Ascending="FALSE"/></OrderBy>"#
    );

    let views = (caml::view_field("B") & caml::view_fields(["A", "B", "C"]))?;
    assert_eq!(
        render(&views),
        r#"<ViewFields><FieldRef Name="B"/><FieldRef Name="A"/><FieldRef Name="C"/></ViewFields>"#
    );
    Ok(())
}

#[test]
fn test_invalid_joins() {
    let err = (caml::eq("A", 1) | caml::order_by("Title")).unwrap_err();
    assert!(matches!(err, ExprError::InvalidJoin { op: LogicalOperator::Or, .. }));

    let err = (caml::order_by("A") | caml::order_by("B")).unwrap_err();
    assert!(matches!(err, ExprError::InvalidJoin { .. }));

    let err = (caml::view_field("Title") & caml::eq("A", 1)).unwrap_err();
    assert!(matches!(err, ExprError::InvalidJoin { .. }));

    let err = (!caml::order_by("Title")).unwrap_err();
    assert!(matches!(
        err,
        ExprError::InvalidJoin { op: LogicalOperator::Not, right: None, .. }
    ));

    let unfiltered = (caml::order_by("A") & caml::group_by("B")).unwrap();
    assert_eq!(unfiltered.kind(), NodeKind::Query);
    assert!((!unfiltered).is_err());
}

#[test]
fn test_predicate_and_sort_promote_to_query() -> TestResult {
    let query = (caml::eq("Status", "Active") & caml::order_by("Title"))?;
    assert_eq!(query.kind(), NodeKind::Query);
    let markup = render(&query);
    assert!(markup.starts_with("<Query><Where>"));
    assert!(markup.ends_with("</OrderBy></Query>"));

    let widened = (query | caml::eq("Status", "Closed"))?;
    let markup = render(&widened);
    assert!(markup.contains("<Where><Or>"));
    Ok(())
}

#[test]
fn test_chained_combinators() -> TestResult {
    let all = caml::all([caml::eq("A", 1), caml::eq("B", 2), caml::eq("C", 3)])?;
    let any = caml::any([caml::eq("A", 1), caml::eq("B", 2)])?;
    assert_eq!(all.kind(), NodeKind::Logical);
    assert_eq!(any.kind(), NodeKind::Logical);
    assert_eq!(caml::all(Vec::new())?, caml::empty());
    Ok(())
}
