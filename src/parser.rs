use std::collections::HashMap;

use thiserror::Error;

use crate::{
    ast::{
        BinOp, Expr, Literal, LogicalOp, Program, Property, PropertyKey, Statement, Token,
        TokenKind, UnaryOp,
    },
    lexer::{LexError, Lexer},
    lvalue::is_assignable,
    value::format_float,
};

/// Structurally invalid token sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error at column {index}: {message}")]
pub struct SyntaxError {
    /// Text of the offending token (empty at end of input)
    pub token: String,
    pub index: usize,
    pub message: String,
}

/// Any failure turning source text into a [`Program`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

/// Keyword table every parser starts from.
pub fn default_literals() -> HashMap<String, Literal> {
    HashMap::from([
        ("true".to_string(), Literal::Boolean(true)),
        ("false".to_string(), Literal::Boolean(false)),
        ("null".to_string(), Literal::Null),
        ("undefined".to_string(), Literal::Undefined),
    ])
}

/// Deepest nesting of parentheses, literals, members and unary operators accepted.
pub const MAX_NESTING: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    literals: HashMap<String, Literal>,
    depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let end = tokens
                .last()
                .map_or(0, |t| t.index + t.text.chars().count());
            tokens.push(Token::eof(end));
        }
        Parser {
            tokens,
            position: 0,
            literals: default_literals(),
            depth: 0,
        }
    }

    /// Tokenizes `source` and returns a parser over the result
    pub fn from_source(source: &str) -> Result<Self, LexError> {
        Ok(Parser::new(Lexer::new(source).tokenize()?))
    }

    /// Replaces the keyword table (`true`, `null`, ... and any host additions)
    pub fn with_literals(mut self, literals: &HashMap<String, Literal>) -> Self {
        self.literals = literals.clone();
        self
    }

    fn current(&self) -> &Token {
        // `new` guarantees a trailing Eof, and `advance` never moves past it
        &self.tokens[self.position]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !token.is_eof() {
            self.position += 1;
        }
        token
    }

    fn check(&self, text: &str) -> bool {
        self.current().is(text)
    }

    fn consume(&mut self, text: &str) -> bool {
        if self.check(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<Token, SyntaxError> {
        if self.check(text) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("expecting '{}'", text)))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String, SyntaxError> {
        if self.current().is_identifier() {
            Ok(self.advance().text)
        } else {
            Err(self.unexpected(&format!("expecting an identifier {}", context)))
        }
    }

    /// Text of the current token when it is an operator
    fn operator(&self) -> Option<&str> {
        let token = self.current();
        (token.kind == TokenKind::Operator).then_some(token.text.as_str())
    }

    fn error_at(token: &Token, message: String) -> SyntaxError {
        SyntaxError {
            token: token.text.clone(),
            index: token.index,
            message,
        }
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_NESTING`]
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(Self::error_at(
                self.current(),
                format!("Expression nesting is too deep (limit {})", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn unexpected(&self, expectation: &str) -> SyntaxError {
        let token = self.current();
        let message = if token.is_eof() {
            format!("Unexpected end of expression, {}", expectation)
        } else {
            format!("Token '{}' is unexpected, {}", token.text, expectation)
        };
        Self::error_at(token, message)
    }

    /// Parses the whole token stream as `;`-separated statements.
    pub fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();

        loop {
            if !self.current().is_eof() && !self.check(";") {
                body.push(Statement::Expression(self.parse_filter_chain()?));
            }
            if !self.consume(";") {
                break;
            }
        }

        if !self.current().is_eof() {
            let token = self.current();
            return Err(Self::error_at(
                token,
                format!("Token '{}' is an unexpected token", token.text),
            ));
        }

        Ok(Program { body })
    }

    /// Statement level: `assignment ('|' name (':' ternary)*)*`
    pub fn parse_filter_chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_expression()?;
        while self.consume("|") {
            expr = self.parse_filter(expr)?;
        }
        Ok(expr)
    }

    fn parse_filter(&mut self, input: Expr) -> Result<Expr, SyntaxError> {
        let name = self.expect_identifier("as filter name")?;
        let mut arguments = Vec::new();
        while self.consume(":") {
            arguments.push(self.parse_ternary()?);
        }
        Ok(Expr::Filter {
            name,
            input: Box::new(input),
            arguments,
        })
    }

    /// Assignment level, the entry point for a single expression
    pub fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(|parser| {
            let target = parser.parse_ternary()?;

            if parser.operator() == Some("=") {
                if !is_assignable(&target) {
                    return Err(Self::error_at(
                        parser.current(),
                        "Trying to assign a value to a non l-value".to_string(),
                    ));
                }
                parser.advance();
                let value = parser.parse_assignment()?; // right-associative
                return Ok(Expr::Assignment {
                    target: Box::new(target),
                    value: Box::new(value),
                });
            }
            Ok(target)
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.parse_logical_or()?;

        if self.consume("?") {
            let consequent = self.parse_assignment()?;
            self.expect(":")?;
            let alternate = self.parse_assignment()?;
            return Ok(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }
        Ok(test)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_logical_and()?;

        while self.operator() == Some("||") {
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_equality()?;

        while self.operator() == Some("&&") {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.operator() {
                Some("==") => BinOp::Equal,
                Some("!=") => BinOp::NotEqual,
                Some("===") => BinOp::StrictEqual,
                Some("!==") => BinOp::StrictNotEqual,
                _ => break,
            };

            self.advance();
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.operator() {
                Some("<") => BinOp::LessThan,
                Some(">") => BinOp::GreaterThan,
                Some("<=") => BinOp::LessEqual,
                Some(">=") => BinOp::GreaterEqual,
                _ => break,
            };

            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.operator() {
                Some("+") => BinOp::Add,
                Some("-") => BinOp::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.operator() {
                Some("*") => BinOp::Multiply,
                Some("/") => BinOp::Divide,
                Some("%") => BinOp::Modulo,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        let op = match self.operator() {
            Some("+") => UnaryOp::Plus,
            Some("-") => UnaryOp::Minus,
            Some("!") => UnaryOp::Not,
            _ => return self.parse_primary(),
        };

        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parse primary expressions (atoms) followed by any `.name`, `[key]` or `(args)`
    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = if self.consume("(") {
            let inner = self.parse_filter_chain()?;
            self.expect(")")?;
            inner
        } else if self.consume("[") {
            self.parse_array_literal()?
        } else if self.consume("{") {
            self.parse_object_literal()?
        } else {
            let token = self.current().clone();
            match token.kind {
                TokenKind::Identifier => {
                    self.advance();
                    self.resolve_identifier(token.text)
                }
                TokenKind::Number | TokenKind::String => {
                    self.advance();
                    match token.value {
                        Some(literal) => Expr::Literal(literal),
                        None => {
                            return Err(Self::error_at(
                                &token,
                                format!("Token '{}' is not a valid literal", token.text),
                            ));
                        }
                    }
                }
                _ => return Err(self.unexpected("not a primary expression")),
            }
        };

        loop {
            if self.consume("(") {
                let arguments = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else if self.consume("[") {
                let property = self.parse_expression()?;
                self.expect("]")?;
                expr = Expr::index(expr, property);
            } else if self.consume(".") {
                let name = self.expect_identifier("after '.'")?;
                expr = Expr::member(expr, name);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// `this`, `$locals`, literal keywords, then plain identifiers
    fn resolve_identifier(&self, name: String) -> Expr {
        match name.as_str() {
            "this" => Expr::This,
            "$locals" => Expr::Locals,
            _ => match self.literals.get(&name) {
                Some(literal) => Expr::Literal(literal.clone()),
                None => Expr::Identifier(name),
            },
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut arguments = Vec::new();
        if !self.check(")") {
            loop {
                arguments.push(self.parse_filter_chain()?);
                if !self.consume(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(arguments)
    }

    /// `[` already consumed; a trailing comma is allowed
    fn parse_array_literal(&mut self) -> Result<Expr, SyntaxError> {
        let mut elements = Vec::new();
        loop {
            if self.check("]") {
                break;
            }
            elements.push(self.parse_expression()?);
            if !self.consume(",") {
                break;
            }
        }
        self.expect("]")?;
        Ok(Expr::Array(elements))
    }

    /// `{` already consumed; a trailing comma is allowed
    fn parse_object_literal(&mut self) -> Result<Expr, SyntaxError> {
        let mut properties = Vec::new();
        loop {
            if self.check("}") {
                break;
            }
            properties.push(self.parse_property()?);
            if !self.consume(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(Expr::Object(properties))
    }

    fn parse_property(&mut self) -> Result<Property, SyntaxError> {
        if self.consume("[") {
            let key = self.parse_expression()?;
            self.expect("]")?;
            self.expect(":")?;
            return Ok(Property {
                key: PropertyKey::Computed(key),
                value: self.parse_expression()?,
            });
        }

        let token = self.current().clone();
        let name = match (&token.kind, &token.value) {
            (TokenKind::Identifier, _) => token.text.clone(),
            (TokenKind::String, Some(Literal::String(s))) => s.clone(),
            (TokenKind::Number, Some(Literal::Integer(n))) => n.to_string(),
            (TokenKind::Number, Some(Literal::Float(n))) => format_float(*n),
            _ => return Err(self.unexpected("expecting an object key")),
        };
        self.advance();

        if token.is_identifier() && !self.check(":") {
            // shorthand `{a}` reads `a` from the scope
            return Ok(Property {
                key: PropertyKey::Named(name.clone()),
                value: Expr::Identifier(name),
            });
        }

        self.expect(":")?;
        Ok(Property {
            key: PropertyKey::Named(name),
            value: self.parse_expression()?,
        })
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Tokenizes and parses `source` with the default keyword table.
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    Ok(Parser::from_source(source)?.parse_program()?)
}
