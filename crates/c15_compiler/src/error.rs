//! The compiler's fatal error: the first lexical, syntax, type or codegen
//! failure, anchored at a source span.

use c15_syntax::diagnostics::Diagnostic;
use c15_syntax::span::{FileId, Location, Span};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Type,
    Codegen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Lexical => "lexical",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Type => "type",
            ErrorKind::Codegen => "codegen",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("{kind} error at {span}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Lexical, message, span)
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Type, message, span)
    }

    pub fn codegen(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Codegen, message, span)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(
            self.message.clone(),
            Some(Location::new(FileId::SOURCE, self.span)),
        )
    }
}

impl From<CompileError> for Diagnostic {
    fn from(err: CompileError) -> Self {
        err.to_diagnostic()
    }
}
