#![allow(dead_code)]

use camlkit::{Expression, ParamValue, ParameterBinding, ParameterMap, ValueType, caml};

pub const STATUS_AND_SCORE: &str = concat!(
    r#"<Where><And>"#,
    r#"<Eq><FieldRef Name="Status"/><Value Type="Text">Active</Value></Eq>"#,
    r#"<Gt><FieldRef Name="Score"/><Value Type="Integer">50</Value></Gt>"#,
    r#"</And></Where>"#
);

pub fn status_and_score() -> Expression {
    (caml::eq("Status", "Active") & caml::gt("Score", 50)).expect("predicates combine")
}

/// Open tasks assigned to the current user, newest first, with the status
/// and priority supplied later.
pub fn open_tasks() -> Expression {
    let filter = caml::eq("Status", ParameterBinding::parameter("status", ValueType::Text))
        & caml::eq("AssignedTo", ParameterBinding::current_user())
        & caml::in_values(
            "Priority",
            ParameterBinding::parameter("priorities", ValueType::Integer),
        );
    (filter & caml::order_by_desc("Created") & caml::order_by("Title"))
        .expect("clauses combine")
}

pub fn open_task_params() -> ParameterMap {
    let mut params = ParameterMap::new();
    params.insert("status".to_string(), ParamValue::from("Open"));
    params.insert("priorities".to_string(), ParamValue::from(vec![1i64, 2]));
    params
}
