mod common;

use camlkit::{
    MembershipKind, ModerationStatus, NoParameters, ParamValue, ParameterBinding, ParameterMap,
    ParseOptions, Render, ValueType, caml, parse_with,
};
use chrono::NaiveDate;
use common::fixtures::{open_task_params, open_tasks, status_and_score};
use common::{TestResult, assert_round_trip, init_logger};
use uuid::Uuid;

#[test]
fn test_comparisons_round_trip() -> TestResult {
    init_logger();
    let when = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let cases = vec![
        status_and_score(),
        caml::neq("Title", "Draft & <notes>"),
        caml::geq("Price", ParameterBinding::number(12.5)),
        caml::leq("Due", ParameterBinding::date_time(when).with_include_time(true)),
        caml::lt("Due", ParameterBinding::date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
        caml::eq("Flag", true),
        caml::eq("UniqueId", Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0)),
        caml::eq("Project", ParameterBinding::lookup_id(7)),
        caml::eq("_ModerationStatus", ModerationStatus::Pending),
        caml::eq("ContentTypeId", ParameterBinding::content_type_id("0x0101")),
        caml::eq("Link", ParameterBinding::url("https://example.com/a?b=c")),
        caml::begins_with("Title", "Q3"),
        caml::in_values("ID", vec![1, 2, 3]),
        caml::in_values("ID", vec![42]),
        caml::includes("Tags", vec!["red", "blue"]),
        caml::is_null("Owner"),
        caml::is_not_null("Owner"),
        caml::membership("AssignedTo", MembershipKind::WebGroups),
    ];
    for expr in &cases {
        assert_round_trip(expr, &NoParameters)?;
    }
    Ok(())
}

#[test]
fn test_sentinels_round_trip() -> TestResult {
    init_logger();
    assert_round_trip(&caml::eq("Author", ParameterBinding::current_user()), &NoParameters)?;
    assert_round_trip(&caml::geq("Due", ParameterBinding::today()), &NoParameters)?;
    assert_round_trip(&caml::geq("Due", ParameterBinding::today_offset(7)), &NoParameters)?;
    assert_round_trip(&caml::lt("Modified", ParameterBinding::now()), &NoParameters)
}

#[test]
fn test_logical_nesting_round_trips() -> TestResult {
    init_logger();
    let expr = ((caml::eq("A", 1) | caml::eq("B", 2)) & caml::is_null("C"))
        .and_then(|e| !e)?;
    assert_round_trip(&expr, &NoParameters)?;

    let not_begins = (!caml::begins_with("Title", "tmp"))?;
    assert_round_trip(&not_begins, &NoParameters)
}

#[test]
fn test_clauses_round_trip() -> TestResult {
    init_logger();
    assert_round_trip(&caml::order_by("Title"), &NoParameters)?;
    assert_round_trip(
        &(caml::order_by_desc("Created") & caml::order_by("Title"))?,
        &NoParameters,
    )?;
    assert_round_trip(&caml::group_by_collapse(["Team", "Region"], false), &NoParameters)?;
    assert_round_trip(&caml::group_by("Team"), &NoParameters)?;
    assert_round_trip(&caml::view_fields(["Title", "Status"]), &NoParameters)?;
    assert_round_trip(&caml::view_field("Title"), &NoParameters)
}

#[test]
fn test_empty_text_value_round_trips() -> TestResult {
    init_logger();
    let expr = (caml::eq("Title", "") & caml::neq("Status", "Active"))?;
    assert_round_trip(&expr, &NoParameters)?;

    let pretty = expr.render(true)?;
    assert!(pretty.contains(r#"<Value Type="Text"/>"#), "{}", pretty);
    assert_eq!(parse_with(&pretty, &ParseOptions::strict())?, expr);
    Ok(())
}

#[test]
fn test_never_with_sort_clause_round_trips() -> TestResult {
    init_logger();
    let expr = (caml::never() & caml::order_by("Title"))?;
    assert_round_trip(&expr, &NoParameters)?;
    let markup = expr.render(false)?;
    assert_eq!(
        markup,
        concat!(
            r#"<Query><Where><IsNull><FieldRef Name="ID"/></IsNull></Where>"#,
            r#"<OrderBy><FieldRef Name="Title" Ascending="TRUE"/></OrderBy></Query>"#
        )
    );
    Ok(())
}

#[test]
fn test_query_round_trips() -> TestResult {
    init_logger();
    let query = (status_and_score() & caml::order_by("Title") & caml::group_by("Team"))?;
    assert_round_trip(&query, &NoParameters)?;
    assert_round_trip(&open_tasks(), &open_task_params())
}

#[test]
fn test_parameters_and_envelopes_round_trip() -> TestResult {
    init_logger();
    let mut params = ParameterMap::new();
    params.insert("field".to_string(), ParamValue::from("Status"));
    params.insert("status".to_string(), ParamValue::from("Active"));
    let expr = caml::eq(
        camlkit::expr::FieldName::parameter("field"),
        ParameterBinding::parameter("status", ValueType::Text),
    );
    assert_round_trip(&expr, &params)?;

    let bound = expr.bind(params);
    assert_round_trip(&bound, &NoParameters)
}
