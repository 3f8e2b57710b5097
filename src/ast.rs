//! # Binding Expressions - Abstract Syntax Tree
//!
//! This module defines the tokens and the syntax tree of the binding-expression
//! language: the small expression phrases templates use to read and write
//! application state.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (literals, references, operators, calls)
//! - **[operators]** - Unary, binary and logical operators
//! - **[program]** - Statements and the top-level program
//!
//! ## Quick Start
//!
//! ```text
//! user.name | uppercase
//! ```
//!
//! Reads `user.name` from the scope and pipes it through the `uppercase` filter.
//!
//! ## Core Concepts
//!
//! ### Scope and Locals
//!
//! Identifiers resolve against the *locals* object first (only when it owns the
//! name), then against the *scope*. `this` names the scope and `$locals` the locals.
//!
//! ### Null-safe Navigation
//!
//! Member access on `null` or `undefined` yields `undefined` instead of failing:
//!
//! ```text
//! order.customer.address.city
//! ```
//!
//! ### Filters
//!
//! Filters chain left to right, each receiving the previous value plus its own
//! colon-separated arguments:
//!
//! ```text
//! price | discount:0.1 | currency:"EUR"
//! ```
//!
//! ### Assignment
//!
//! Identifiers and member chains rooted in one are assignable; missing intermediate
//! objects are created on the way:
//!
//! ```text
//! form.address.city = "Paris"
//! ```
//!
//! ### One-time Bindings
//!
//! A leading `::` marks an expression as one-time: once it yields a defined value the
//! caller may stop re-evaluating it.
//!
//! ```text
//! ::user.id
//! ```
pub mod expressions;
pub mod operators;
pub mod program;
pub mod tokens;

pub use expressions::{Expr, Literal, Property, PropertyKey};
pub use operators::{BinOp, LogicalOp, UnaryOp};
pub use program::{Program, Statement};
pub use tokens::{Token, TokenKind};
