//! Debug views of the lexer and parser output

use super::CliError;
use crate::{lexer::tokenize, parser::parse_source};

/// One token per line: `index  kind  text`
pub fn render_tokens(source: &str) -> Result<String, CliError> {
    let tokens = tokenize(source).map_err(|e| CliError::Parse(e.into()))?;
    let lines: Vec<String> = tokens
        .iter()
        .map(|t| format!("{:>4}  {:<11}  {}", t.index, format!("{:?}", t.kind), t.text))
        .collect();
    Ok(lines.join("\n"))
}

/// Pretty-printed syntax tree
pub fn render_ast(source: &str) -> Result<String, CliError> {
    let program = parse_source(source)?;
    Ok(format!("{:#?}", program))
}
