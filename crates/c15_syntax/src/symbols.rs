//! Editor symbols: source spans tagged with a semantic class for highlighting.

use crate::span::Span;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolClass {
    Function,
    Variable,
    Parameter,
    Constant,
    Intrinsic,
}

impl SymbolClass {
    /// CSS class the editor decorates the span with.
    pub fn class_name(self) -> &'static str {
        match self {
            SymbolClass::Function => "symbol-function",
            SymbolClass::Variable => "symbol-variable",
            SymbolClass::Parameter => "symbol-parameter",
            SymbolClass::Constant => "symbol-constant",
            SymbolClass::Intrinsic => "symbol-intrinsic",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub span: Span,
    pub class: SymbolClass,
}

impl Symbol {
    pub fn new(span: Span, class: SymbolClass) -> Self {
        Self { span, class }
    }
}
