pub mod ast;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compiled;
pub mod config;
pub mod engine;
pub mod filters;
pub mod interpreter;
pub mod lexer;
pub mod lvalue;
pub mod ops;
pub mod parser;
pub mod sandbox;
pub mod value;

pub use ast::{BinOp, Expr, Literal, Program, Statement, Token, TokenKind};
pub use cache::ExpressionCache;
pub use compiled::{CompiledExpression, Observation};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, parse};
pub use filters::{Filter, FilterRegistry, FilterResolver, NoFilters};
pub use interpreter::{Context, EvalError, Interpreter, Purity};
pub use lexer::{LexError, Lexer, tokenize};
pub use parser::{ParseError, Parser, SyntaxError, parse_source};
pub use sandbox::{DEFAULT_DENYLIST, Sandbox};
pub use value::{Array, Function, MAX_ARRAY_LENGTH, Object, Value};
