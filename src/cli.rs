//! The `camlkit` command line: reformat, negate or inspect CAML markup.
//!
//! Input may carry `{{name}}` placeholders as value text or field names; they
//! are filled from `--bind` and `--params` when the markup is rendered.

use crate::error::CamlkitError;
use camlkit_binding::{Layered, ParamValue, ParameterMap};
use camlkit_xml::{ParseOptions, Render, RenderOptions, parse_with};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "camlkit")]
#[command(about = "Format, negate and check CAML query markup")]
pub struct Cli {
    /// Indent the rendered markup
    #[arg(long, global = true, env = "CAMLKIT_PRETTY")]
    pub pretty: bool,

    /// Reject markup the lenient parser would repair
    #[arg(long, global = true)]
    pub strict: bool,

    /// Value for a {{NAME}} placeholder, as NAME=VALUE (repeatable)
    #[arg(long = "bind", value_name = "NAME=VALUE", global = true, value_parser = parse_binding)]
    pub bindings: Vec<(String, String)>,

    /// JSON object of further parameters; --bind values take precedence
    #[arg(long, value_name = "FILE", global = true)]
    pub params: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and re-render markup
    Fmt {
        /// Input file; standard input when omitted
        file: Option<PathBuf>,
    },
    /// Parse, negate and render markup
    Negate { file: Option<PathBuf> },
    /// Parse markup and report what it holds
    Check { file: Option<PathBuf> },
}

impl Command {
    pub fn file(&self) -> Option<&Path> {
        match self {
            Command::Fmt { file } | Command::Negate { file } | Command::Check { file } => {
                file.as_deref()
            }
        }
    }
}

fn parse_binding(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

/// Reads the input named by the command, or standard input.
pub fn read_input(cli: &Cli) -> Result<String, CamlkitError> {
    match cli.command.file() {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(std::io::read_to_string(std::io::stdin())?),
    }
}

fn load_params(path: Option<&Path>) -> Result<serde_json::Map<String, serde_json::Value>, CamlkitError> {
    let Some(path) = path else {
        return Ok(serde_json::Map::new());
    };
    match serde_json::from_str(&std::fs::read_to_string(path)?)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(CamlkitError::Parameters(format!(
            "{} must hold a JSON object, found {}",
            path.display(),
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Runs the command against `input` and returns what should be printed.
pub fn execute(cli: &Cli, input: &str) -> Result<String, CamlkitError> {
    let parse_options = ParseOptions::default()
        .with_strict(cli.strict)
        .with_placeholders(true);
    let expr = parse_with(input, &parse_options)?;

    let bindings: ParameterMap = cli
        .bindings
        .iter()
        .map(|(name, value)| (name.clone(), ParamValue::from(value.as_str())))
        .collect();
    let json = load_params(cli.params.as_deref())?;
    let params = Layered::new(&bindings, &json);
    let options = RenderOptions::default().with_pretty(cli.pretty);

    match &cli.command {
        Command::Fmt { .. } => Ok(expr.render_with(&params, &options)?),
        Command::Negate { .. } => Ok(expr.negate()?.render_with(&params, &options)?),
        Command::Check { .. } => {
            let names = expr.parameter_names();
            let mut report = format!("kind: {}\nfamily: {}", expr.kind(), expr.family());
            if !names.is_empty() {
                let names: Vec<String> = names.into_iter().collect();
                report.push_str(&format!("\nparameters: {}", names.join(", ")));
            }
            Ok(report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        assert_eq!(
            parse_binding("status=Active"),
            Ok(("status".to_string(), "Active".to_string()))
        );
        assert_eq!(
            parse_binding("expr=a=b"),
            Ok(("expr".to_string(), "a=b".to_string()))
        );
        assert!(parse_binding("status").is_err());
        assert!(parse_binding("=x").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "camlkit", "fmt", "--pretty", "--bind", "a=1", "--bind", "b=2", "query.xml",
        ])
        .unwrap();
        assert!(cli.pretty);
        assert_eq!(cli.bindings.len(), 2);
        assert_eq!(cli.command.file(), Some(Path::new("query.xml")));
    }
}
