use crate::ast::Literal;

/// Broad classification of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    ///
    /// Keywords such as `true`, `this` or `$locals` are lexed as identifiers and
    /// resolved by the parser.
    ///
    /// # Examples
    /// ```text
    /// user
    /// $index
    /// _private
    /// ```
    Identifier,

    /// Numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// .5
    /// 1e-3
    /// ```
    Number,

    /// String literal in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'it\'s'
    /// ```
    String,

    /// Structural punctuation: `( ) [ ] { } . , ; : ?`
    Punctuation,

    /// Operator: `+ - * / % ! = == != === !== < > <= >= && || |`
    Operator,

    /// End of input
    Eof,
}

/// A single lexical token.
///
/// Tokens are produced once by the lexer and consumed in order by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,

    /// Raw source text of the token (empty for `Eof`)
    pub text: String,

    /// Decoded literal for number and string tokens
    pub value: Option<Literal>,

    /// Character offset of the first character in the source
    pub index: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, index: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            value: None,
            index,
        }
    }

    pub fn literal(kind: TokenKind, text: impl Into<String>, value: Literal, index: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            value: Some(value),
            index,
        }
    }

    pub fn eof(index: usize) -> Self {
        Token::new(TokenKind::Eof, "", index)
    }

    /// True for punctuation or operator tokens whose text is `text`
    pub fn is(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Punctuation | TokenKind::Operator) && self.text == text
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}
