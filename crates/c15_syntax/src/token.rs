//! Lexer tokens for C15.

use crate::span::Span;
use crate::types::Intrinsic;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Literals
    IntLiteral(u32),
    UIntLiteral(u32),
    FloatLiteral(f32),

    // Identifiers and keywords
    Ident(String),
    Intrinsic(Intrinsic),
    Int,
    UInt,
    Float,
    Void,
    Const,
    Struct,
    Return,
    Do,
    For,
    While,
    Break,
    Continue,
    If,
    Else,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,

    // Operators
    Assign,        // =
    PlusAssign,    // +=
    MinusAssign,   // -=
    StarAssign,    // *=
    SlashAssign,   // /=
    PercentAssign, // %=
    AmpAssign,     // &=
    PipeAssign,    // |=
    CaretAssign,   // ^=
    ShlAssign,     // <<=
    ShrAssign,     // >>=
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Not,
    AndAnd,
    OrOr,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,

    Eof,
}

impl TokenKind {
    /// Keyword lookup for an identifier-shaped lexeme.
    pub fn keyword(s: &str) -> Option<TokenKind> {
        let kind = match s {
            "int" => TokenKind::Int,
            "uint" => TokenKind::UInt,
            "float" => TokenKind::Float,
            "void" => TokenKind::Void,
            "const" => TokenKind::Const,
            "struct" => TokenKind::Struct,
            "return" => TokenKind::Return,
            "do" => TokenKind::Do,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            _ => return Intrinsic::from_name(s).map(TokenKind::Intrinsic),
        };
        Some(kind)
    }

    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Int | TokenKind::UInt | TokenKind::Float | TokenKind::Void | TokenKind::Const
        )
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text the token was read from.
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
