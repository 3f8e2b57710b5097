//! Validate an expression and report how it was classified

use std::path::PathBuf;

use super::{CliError, engine_for};
use crate::Purity;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to validate
    pub expression: String,
    /// Engine configuration file
    pub config: Option<PathBuf>,
}

/// Classification of a syntactically valid expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub purity: Purity,
    pub constant: bool,
    pub literal: bool,
    pub assignable: bool,
    pub one_time: bool,
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Syntax is valid")?;
        writeln!(f, "  purity:     {:?}", self.purity)?;
        writeln!(f, "  constant:   {}", self.constant)?;
        writeln!(f, "  literal:    {}", self.literal)?;
        writeln!(f, "  assignable: {}", self.assignable)?;
        write!(f, "  one-time:   {}", self.one_time)
    }
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckReport, CliError> {
    let engine = engine_for(options.config.as_deref())?;
    let expression = engine.compile(&options.expression)?;

    Ok(CheckReport {
        purity: expression.purity(),
        constant: expression.is_constant(),
        literal: expression.is_literal(),
        assignable: expression.is_assignable(),
        one_time: expression.is_one_time(),
    })
}
