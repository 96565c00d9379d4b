//! C15 syntax: tokens, AST nodes, spans, types, diagnostics, symbols, IR.

pub mod ast;
pub mod diagnostics;
pub mod ir;
pub mod span;
pub mod symbols;
pub mod token;
pub mod types;

pub use ast::*;
pub use diagnostics::*;
pub use ir::*;
pub use span::*;
pub use symbols::*;
pub use token::*;
pub use types::*;
