#![allow(dead_code)]

pub mod fixtures;

use camlkit::{Expression, NoParameters, ParameterSource, Render, RenderOptions, parse};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Compact markup with no outside parameters.
pub fn render(expr: &Expression) -> String {
    expr.render(false).expect("expression should render")
}

/// Renders `expr`, parses the markup back and checks that the tree matches
/// the resolved form of the original.
pub fn assert_round_trip(expr: &Expression, params: &dyn ParameterSource) -> TestResult {
    let markup = expr.render_with(params, &RenderOptions::default())?;
    let parsed = parse(&markup)?;
    let expected = expr.resolve(params)?;
    assert_eq!(parsed, expected, "markup did not read back: {}", markup);

    // Rendering the parsed tree again must be stable.
    let again = parsed.render_with(&NoParameters, &RenderOptions::default())?;
    assert_eq!(again, markup);
    Ok(())
}
