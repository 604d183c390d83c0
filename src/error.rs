use camlkit_expr::ExprError;
use camlkit_xml::CamlError;
use thiserror::Error;

/// Errors surfaced by the command-line front end.
#[derive(Error, Debug)]
pub enum CamlkitError {
    #[error("Markup error: {0}")]
    Markup(#[from] CamlError),

    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    Parameters(String),
}
