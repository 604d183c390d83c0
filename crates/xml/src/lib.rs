//! CAML markup for camlkit expressions.
//!
//! [`render`] writes an expression out as CAML, binding deferred values on the
//! way; [`parse`] reads markup back into an expression tree.
//!
//! ```ignore
//! use camlkit_expr::caml;
//! use camlkit_xml::Render;
//!
//! let expr = (caml::eq("Status", "Active") & caml::gt("Score", 50))?;
//! let markup = expr.render(false)?;
//! assert_eq!(camlkit_xml::parse(&markup)?, expr);
//! ```

pub mod builder;
pub mod error;
pub mod options;
pub mod reader;
pub mod tags;
pub mod writer;

pub use error::{CamlError, Location};
pub use options::{ParseOptions, RenderOptions};
pub use reader::{parse, parse_with};
pub use writer::{last_rendered, render};

use camlkit_binding::{NoParameters, ParameterSource};
use camlkit_expr::Expression;

/// Rendering entry points as methods on [`Expression`].
pub trait Render {
    /// Renders with no parameters beyond those bound into the expression.
    fn render(&self, pretty: bool) -> Result<String, CamlError>;

    fn render_with(
        &self,
        params: &dyn ParameterSource,
        options: &RenderOptions,
    ) -> Result<String, CamlError>;
}

impl Render for Expression {
    fn render(&self, pretty: bool) -> Result<String, CamlError> {
        writer::render(
            self,
            &NoParameters,
            &RenderOptions::default().with_pretty(pretty),
        )
    }

    fn render_with(
        &self,
        params: &dyn ParameterSource,
        options: &RenderOptions,
    ) -> Result<String, CamlError> {
        writer::render(self, params, options)
    }
}
