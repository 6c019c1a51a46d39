use std::{collections::BTreeMap, str::Chars};

use itertools::{peek_nth, PeekNth};
use once_cell::sync::Lazy;
use strum::EnumString;

use crate::frontend::intern::InternedSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: InternedSymbol,
    /// 1-based line of the token's first character
    pub line: usize,
    /// 1-based column of the token's first character
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // fun
    Identifier,       // main

    /* Literals */
    IntegerLiteral, // 1
    FloatLiteral,   // 1.0
    StringLiteral,  // "hello, world"

    /* Delimiters */
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Comma,      // ,
    Dot,        // .
    Colon,      // :
    Semicolon,  // ;
    Arrow,      // ->

    /* Unary Ops */
    Bang, // !

    /* Binary Ops */
    Plus,                 // +
    Minus,                // -
    Asterisk,             // *
    Slash,                // /
    Percent,              // %
    LogicalAnd,           // &&
    LogicalOr,            // ||
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment */
    Equals, // =

    /* Special */
    Eof,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Fun,
    Val,
    Var,
    If,
    Else,
    While,
    Return,
    Break,
    Continue,
    True,
    False,
    Null,

    /* Reserved for future use; recognized but rejected by the parser */
    Package,
    Import,
    Class,
    Interface,
    When,
    For,
    As,
    Is,
    This,
    Super,
    In,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (',', TokenKind::Comma),
        ('.', TokenKind::Dot),
        (':', TokenKind::Colon),
        (';', TokenKind::Semicolon),
        ('!', TokenKind::Bang),
        ('+', TokenKind::Plus),
        ('-', TokenKind::Minus),
        ('*', TokenKind::Asterisk),
        ('/', TokenKind::Slash),
        ('%', TokenKind::Percent),
        ('=', TokenKind::Equals),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
    ])
});

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source str,
    chars: PeekNth<Chars<'source>>,
    position: usize,
    line: usize,
    column: usize,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            chars: peek_nth(source.chars()),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans the entire source, ending the stream with exactly one EOF token.
    /// Lexing never fails; malformed input is surfaced as `Invalid` tokens for
    /// the parser to choke on.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token() {
            tokens.push(token);
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: InternedSymbol::new(""),
            line: self.line,
            column: self.column,
        });

        tokens
    }

    fn is_eof(&self) -> bool {
        self.position >= self.source.len()
    }

    fn peek_is(&mut self, nth: usize, expected: char) -> bool {
        self.chars.peek_nth(nth).is_some_and(|c| *c == expected)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    fn ignore_whitespace_and_comments(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '/' if self.peek_is(1, '/') => self.ignore_line(),
                '/' if self.peek_is(1, '*') => self.ignore_block_comment(),
                _ => break,
            }
        }
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.bump();
        }
    }

    /// Block comments nest: each inner `/*` bumps the depth and each `*/`
    /// drops it; the comment only ends once the depth returns to zero. An
    /// unclosed comment silently swallows the rest of the file.
    fn ignore_block_comment(&mut self) {
        self.bump();
        self.bump();

        let mut depth = 1usize;

        while depth > 0 && !self.is_eof() {
            if self.peek_is(0, '/') && self.peek_is(1, '*') {
                self.bump();
                self.bump();
                depth += 1;
            } else if self.peek_is(0, '*') && self.peek_is(1, '/') {
                self.bump();
                self.bump();
                depth -= 1;
            } else {
                self.bump();
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.ignore_whitespace_and_comments();

        let c = self.chars.peek().copied()?;
        let (line, column) = (self.line, self.column);

        let token = match c {
            a if a.is_ascii_alphabetic() || a == '_' => self.read_word(),
            n if n.is_ascii_digit() => self.read_number(),
            '"' => self.read_string(),

            // Maximal munch: two character operators before single ones
            '-' if self.peek_is(1, '>') => self.read_double(TokenKind::Arrow),
            '=' if self.peek_is(1, '=') => self.read_double(TokenKind::DoubleEquals),
            '!' if self.peek_is(1, '=') => self.read_double(TokenKind::NotEquals),
            '<' if self.peek_is(1, '=') => self.read_double(TokenKind::LessThanOrEqualTo),
            '>' if self.peek_is(1, '=') => self.read_double(TokenKind::GreaterThanOrEqualTo),
            '&' if self.peek_is(1, '&') => self.read_double(TokenKind::LogicalAnd),
            '|' if self.peek_is(1, '|') => self.read_double(TokenKind::LogicalOr),

            s if SINGLE_TOKENS.contains_key(&s) => {
                self.read_single(*SINGLE_TOKENS.get(&s).unwrap())
            }

            // A lone `&` or `|` (and anything else unrecognized) becomes an
            // Invalid token rather than a lexer failure
            _ => {
                self.bump();
                (TokenKind::Invalid, InternedSymbol::new(&c.to_string()))
            }
        };

        let (kind, lexeme) = token;

        Some(Token {
            kind,
            lexeme,
            line,
            column,
        })
    }

    // Keyword or identifier
    fn read_word(&mut self) -> (TokenKind, InternedSymbol) {
        let start = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }

            self.bump();
        }

        let value = &self.source[start..self.position];

        let kind = match value.parse::<Keyword>() {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(_) => TokenKind::Identifier,
        };

        (kind, InternedSymbol::new(value))
    }

    fn read_number(&mut self) -> (TokenKind, InternedSymbol) {
        let start = self.position;
        let mut kind = TokenKind::IntegerLiteral;

        while let Some(c) = self.chars.peek().copied() {
            if !c.is_ascii_digit() {
                break;
            }

            self.bump();
        }

        // A dot only turns the literal into a float when a digit follows;
        // `1.` lexes as an integer and a dot
        if self.peek_is(0, '.') && self.chars.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::FloatLiteral;
            self.bump();

            while let Some(c) = self.chars.peek().copied() {
                if !c.is_ascii_digit() {
                    break;
                }

                self.bump();
            }
        }

        (kind, InternedSymbol::new(&self.source[start..self.position]))
    }

    // Double quoted, no escapes. The lexeme excludes the quotes.
    fn read_string(&mut self) -> (TokenKind, InternedSymbol) {
        self.bump();
        let start = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if c == '"' {
                let value = &self.source[start..self.position];
                self.bump();
                return (TokenKind::StringLiteral, InternedSymbol::new(value));
            }

            self.bump();
        }

        (TokenKind::Invalid, InternedSymbol::new("Unterminated string"))
    }

    fn read_single(&mut self, kind: TokenKind) -> (TokenKind, InternedSymbol) {
        let start = self.position;

        self.bump();

        (kind, InternedSymbol::new(&self.source[start..self.position]))
    }

    fn read_double(&mut self, kind: TokenKind) -> (TokenKind, InternedSymbol) {
        let start = self.position;

        self.bump();
        self.bump();

        (kind, InternedSymbol::new(&self.source[start..self.position]))
    }
}
