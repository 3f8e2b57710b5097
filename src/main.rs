use std::io::{self, Read};
use std::path::PathBuf;

use bindex::cli::{self, CheckOptions, CliError, EvalOptions, EvalResult};
use clap::{Parser as ClapParser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "bindex")]
#[command(about = "bindex - parse, inspect and evaluate binding expressions")]
#[command(version)]
struct Cli {
    /// Log compilation details to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of an expression
    Tokens {
        /// The expression to tokenize
        expression: String,
    },

    /// Print the syntax tree of an expression
    Ast {
        /// The expression to parse
        expression: String,
    },

    /// Validate an expression and show its classification
    Check {
        /// The expression to validate
        expression: String,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Evaluate an expression against a JSON scope
    Eval {
        /// The expression to evaluate
        expression: String,

        /// JSON scope (reads from stdin if not provided)
        #[arg(short, long)]
        scope: Option<String>,

        /// JSON locals object
        #[arg(short, long)]
        locals: Option<String>,

        /// Assign this JSON value through the expression and print the scope
        #[arg(short, long)]
        assign: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Tokens { expression } => cli::render_tokens(&expression).map(print_line),
        Commands::Ast { expression } => cli::render_ast(&expression).map(print_line),
        Commands::Check { expression, config } => {
            cli::execute_check(&CheckOptions { expression, config }).map(|report| {
                println!("{}", report);
            })
        }
        Commands::Eval {
            expression,
            scope,
            locals,
            assign,
            pretty,
            config,
        } => run_eval(
            EvalOptions {
                expression,
                scope,
                locals,
                assign,
                config,
            },
            pretty,
        ),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn print_line(text: String) {
    println!("{}", text);
}

fn run_eval(mut options: EvalOptions, pretty: bool) -> Result<(), CliError> {
    if options.scope.is_none() && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        if !buffer.trim().is_empty() {
            options.scope = Some(buffer);
        }
    }

    let (output, settled) = match cli::execute_eval(&options)? {
        EvalResult::Value { value, settled } => (value, Some(settled)),
        EvalResult::Assigned { scope } => (scope, None),
    };

    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", json);

    if let Some(settled) = settled {
        tracing::debug!(settled, "evaluation finished");
    }
    Ok(())
}
