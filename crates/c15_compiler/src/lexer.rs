//! Lexer: source text → tokens.

use crate::error::{CompileError, CompileResult};
use c15_syntax::span::Span;
use c15_syntax::token::{Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8() as u32;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.next();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.offset)
    }

    fn token(&self, kind: TokenKind, start: u32) -> Token {
        let span = self.span_from(start);
        Token::new(kind, &self.source[start as usize..self.offset as usize], span)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.next();
        }
    }

    fn skip_line_comment(&mut self) {
        while matches!(self.peek(), Some(c) if c != '\n') {
            self.next();
        }
    }

    fn skip_block_comment(&mut self, start: u32) -> CompileResult<()> {
        loop {
            match self.next() {
                None => {
                    return Err(CompileError::lexical(
                        "Unterminated block comment",
                        self.span_from(start),
                    ))
                }
                Some('*') if self.peek() == Some('/') => {
                    self.next();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn read_ident_or_keyword(&mut self, start: u32) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.next();
        }
        let text = &self.source[start as usize..self.offset as usize];
        let kind = TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()));
        self.token(kind, start)
    }

    fn read_digits(&mut self, radix: u32) {
        while matches!(self.peek(), Some(c) if c.is_digit(radix)) {
            self.next();
        }
    }

    fn read_number(&mut self, start: u32) -> CompileResult<Token> {
        if self.peek() == Some('0') && matches!(self.peek_second(), Some('x' | 'X')) {
            self.next();
            self.next();
            let digits_start = self.offset as usize;
            self.read_digits(16);
            let digits = &self.source[digits_start..self.offset as usize];
            let value = u32::from_str_radix(digits, 16).map_err(|_| {
                CompileError::lexical(
                    "Invalid hexadecimal literal (limited to 32 bits)",
                    self.span_from(start),
                )
            })?;
            let kind = if self.eat('u') || self.eat('U') {
                TokenKind::UIntLiteral(value)
            } else {
                TokenKind::IntLiteral(value)
            };
            return self.finish_number(kind, start);
        }

        let mut is_float = false;
        self.read_digits(10);
        if self.peek() == Some('.') {
            is_float = true;
            self.next();
            self.read_digits(10);
        }
        if matches!(self.peek(), Some('e' | 'E'))
            && matches!(self.peek_second(), Some(c) if c.is_ascii_digit() || c == '+' || c == '-')
        {
            is_float = true;
            self.next();
            if matches!(self.peek(), Some('+' | '-')) {
                self.next();
            }
            self.read_digits(10);
        }
        let text = &self.source[start as usize..self.offset as usize];

        if is_float || matches!(self.peek(), Some('f' | 'F')) {
            let value: f32 = text.parse().map_err(|_| {
                CompileError::lexical(
                    format!("Invalid float literal: {}", text),
                    self.span_from(start),
                )
            })?;
            if !value.is_finite() {
                return Err(CompileError::lexical(
                    "Float literal out of range",
                    self.span_from(start),
                ));
            }
            if !self.eat('f') {
                self.eat('F');
            }
            return self.finish_number(TokenKind::FloatLiteral(value), start);
        }

        let value: u32 = text.parse().map_err(|_| {
            CompileError::lexical(
                "Integer literal out of range (limited to 32 bits)",
                self.span_from(start),
            )
        })?;
        let kind = if self.eat('u') || self.eat('U') {
            TokenKind::UIntLiteral(value)
        } else {
            TokenKind::IntLiteral(value)
        };
        self.finish_number(kind, start)
    }

    /// A literal must not run straight into an identifier character.
    fn finish_number(&mut self, kind: TokenKind, start: u32) -> CompileResult<Token> {
        if matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                self.next();
            }
            return Err(CompileError::lexical(
                format!(
                    "Invalid numeric literal: {}",
                    &self.source[start as usize..self.offset as usize]
                ),
                self.span_from(start),
            ));
        }
        Ok(self.token(kind, start))
    }

    pub fn next_token(&mut self) -> CompileResult<Token> {
        loop {
            self.skip_whitespace();
            let start = self.offset;

            let c = match self.peek() {
                Some(c) => c,
                None => return Ok(self.token(TokenKind::Eof, start)),
            };

            if c == '/' && self.peek_second() == Some('/') {
                self.skip_line_comment();
                continue;
            }
            if c == '/' && self.peek_second() == Some('*') {
                self.next();
                self.next();
                self.skip_block_comment(start)?;
                continue;
            }

            if c.is_ascii_alphabetic() || c == '_' {
                return Ok(self.read_ident_or_keyword(start));
            }

            if c.is_ascii_digit()
                || (c == '.' && matches!(self.peek_second(), Some(d) if d.is_ascii_digit()))
            {
                return self.read_number(start);
            }

            self.next();
            let kind = match c {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '~' => TokenKind::Tilde,
                '+' => {
                    if self.eat('+') {
                        TokenKind::PlusPlus
                    } else if self.eat('=') {
                        TokenKind::PlusAssign
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => {
                    if self.eat('-') {
                        TokenKind::MinusMinus
                    } else if self.eat('=') {
                        TokenKind::MinusAssign
                    } else {
                        TokenKind::Minus
                    }
                }
                '*' => {
                    if self.eat('=') {
                        TokenKind::StarAssign
                    } else {
                        TokenKind::Star
                    }
                }
                '/' => {
                    if self.eat('=') {
                        TokenKind::SlashAssign
                    } else {
                        TokenKind::Slash
                    }
                }
                '%' => {
                    if self.eat('=') {
                        TokenKind::PercentAssign
                    } else {
                        TokenKind::Percent
                    }
                }
                '&' => {
                    if self.eat('&') {
                        TokenKind::AndAnd
                    } else if self.eat('=') {
                        TokenKind::AmpAssign
                    } else {
                        TokenKind::Amp
                    }
                }
                '|' => {
                    if self.eat('|') {
                        TokenKind::OrOr
                    } else if self.eat('=') {
                        TokenKind::PipeAssign
                    } else {
                        TokenKind::Pipe
                    }
                }
                '^' => {
                    if self.eat('=') {
                        TokenKind::CaretAssign
                    } else {
                        TokenKind::Caret
                    }
                }
                '!' => {
                    if self.eat('=') {
                        TokenKind::Ne
                    } else {
                        TokenKind::Not
                    }
                }
                '=' => {
                    if self.eat('=') {
                        TokenKind::Eq
                    } else {
                        TokenKind::Assign
                    }
                }
                '<' => {
                    if self.eat('<') {
                        if self.eat('=') {
                            TokenKind::ShlAssign
                        } else {
                            TokenKind::Shl
                        }
                    } else if self.eat('=') {
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    if self.eat('>') {
                        if self.eat('=') {
                            TokenKind::ShrAssign
                        } else {
                            TokenKind::Shr
                        }
                    } else if self.eat('=') {
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                other => {
                    return Err(CompileError::lexical(
                        format!("Unexpected character '{}'", other),
                        self.span_from(start),
                    ))
                }
            };
            return Ok(self.token(kind, start));
        }
    }

    /// Lex entire source into token stream (for parser).
    pub fn collect_tokens(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let is_eof = t.is_eof();
            tokens.push(t);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

/// Lex a whole source string.
pub fn tokenize(source: &str) -> CompileResult<Vec<Token>> {
    Lexer::new(source).collect_tokens()
}
