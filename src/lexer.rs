use thiserror::Error;

use crate::ast::{Literal, Token, TokenKind};

/// Malformed token-level input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Lexer error at column {position}: {message}")]
pub struct LexError {
    /// Character offset where the problem was detected
    pub position: usize,
    pub message: String,
}

impl LexError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        LexError {
            position,
            message: message.into(),
        }
    }
}

const PUNCTUATION: &str = "()[]{}.,;:?";
const THREE_CHAR_OPERATORS: [&str; 2] = ["===", "!=="];
const TWO_CHAR_OPERATORS: [&str; 6] = ["==", "!=", "<=", ">=", "&&", "||"];
const ONE_CHAR_OPERATORS: &str = "+-*/%<>!=|";

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn slice(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn is_identifier_start(ch: char) -> bool {
        ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
    }

    fn is_identifier_part(ch: char) -> bool {
        Self::is_identifier_start(ch) || ch.is_ascii_digit()
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        while self.current_char().is_some_and(Self::is_identifier_part) {
            self.advance();
        }
        Token::new(TokenKind::Identifier, self.slice(start), start)
    }

    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    let text = self.slice(start);
                    return Ok(Token::literal(
                        TokenKind::String,
                        text,
                        Literal::String(result),
                        start,
                    ));
                }
                '\\' => {
                    let escape_at = self.position;
                    self.advance();
                    let unescaped = match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('v') => '\u{b}',
                        Some('0') => '\0',
                        Some(c @ ('\'' | '"' | '\\' | '/')) => c,
                        Some('u') => {
                            self.advance();
                            result.push(self.read_unicode_escape(escape_at)?);
                            continue;
                        }
                        Some(other) => {
                            return Err(LexError::new(
                                escape_at,
                                format!("Invalid escape sequence: \\{}", other),
                            ));
                        }
                        None => break,
                    };
                    result.push(unescaped);
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new(start, "Unterminated string literal"))
    }

    /// Reads the digits of a `\uXXXX` escape (the `\u` is already consumed),
    /// pairing a high surrogate with the low surrogate escape that must follow it.
    fn read_unicode_escape(&mut self, escape_at: usize) -> Result<char, LexError> {
        let high = self.read_hex4(escape_at)?;

        let code = match high {
            0xD800..=0xDBFF => {
                if self.current_char() != Some('\\') || self.peek_char(1) != Some('u') {
                    return Err(LexError::new(escape_at, "Unpaired surrogate in unicode escape"));
                }
                self.advance();
                self.advance();
                let low = self.read_hex4(escape_at)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(LexError::new(escape_at, "Unpaired surrogate in unicode escape"));
                }
                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => {
                return Err(LexError::new(escape_at, "Unpaired surrogate in unicode escape"));
            }
            code => code,
        };

        char::from_u32(code)
            .ok_or_else(|| LexError::new(escape_at, "Invalid unicode escape"))
    }

    fn read_hex4(&mut self, escape_at: usize) -> Result<u32, LexError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .current_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| LexError::new(escape_at, "Invalid unicode escape"))?;
            code = code * 16 + digit;
            self.advance();
        }
        Ok(code)
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut is_float = false;

        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            let digits_at = match self.peek_char(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if !self.peek_char(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError::new(
                    self.position,
                    "Malformed numeric literal: invalid exponent",
                ));
            }
            is_float = true;
            for _ in 0..digits_at {
                self.advance();
            }
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.current_char().is_some_and(Self::is_identifier_part) {
            return Err(LexError::new(
                start,
                format!("Malformed numeric literal: {}", self.slice(start)),
            ));
        }

        let text = self.slice(start);
        let value = if is_float {
            Literal::Float(parse_float(&text, start)?)
        } else {
            match text.parse::<i64>() {
                Ok(n) => Literal::Integer(n),
                Err(_) => Literal::Float(parse_float(&text, start)?),
            }
        };

        Ok(Token::literal(TokenKind::Number, text, value, start))
    }

    fn read_operator(&mut self) -> Option<Token> {
        let start = self.position;
        let candidates = THREE_CHAR_OPERATORS
            .iter()
            .map(|op| (3, *op))
            .chain(TWO_CHAR_OPERATORS.iter().map(|op| (2, *op)));

        for (len, op) in candidates {
            let matches = op
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_char(i) == Some(c));
            if matches {
                self.position += len;
                return Some(Token::new(TokenKind::Operator, op, start));
            }
        }

        let ch = self.current_char()?;
        if ONE_CHAR_OPERATORS.contains(ch) {
            self.advance();
            return Some(Token::new(TokenKind::Operator, ch.to_string(), start));
        }
        None
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.position;

        match self.current_char() {
            None => Ok(Token::eof(start)),
            Some(quote @ ('"' | '\'')) => self.read_string(quote),
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()
            }
            Some(ch) if Self::is_identifier_start(ch) => Ok(self.read_identifier()),
            Some(ch) if PUNCTUATION.contains(ch) => {
                self.advance();
                Ok(Token::new(TokenKind::Punctuation, ch.to_string(), start))
            }
            Some(ch) => self
                .read_operator()
                .ok_or_else(|| LexError::new(start, format!("Unexpected character '{}'", ch))),
        }
    }

    /// Consumes the whole input, returning every token followed by a single `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn parse_float(text: &str, position: usize) -> Result<f64, LexError> {
    text.parse::<f64>()
        .map_err(|_| LexError::new(position, format!("Malformed numeric literal: {}", text)))
}

/// Converts source text into its token sequence.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[test]
fn test_operators_prefer_longest_match() {
    let tokens = tokenize("a !== b == c").unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "!==", "b", "==", "c", ""]);
}

#[test]
fn test_member_chain() {
    let tokens = tokenize("a.b[0]").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert!(tokens[1].is("."));
    assert_eq!(tokens[2].text, "b");
    assert!(tokens[3].is("["));
    assert_eq!(tokens[4].value, Some(Literal::Integer(0)));
    assert!(tokens[5].is("]"));
    assert!(tokens[6].is_eof());
}
