//! AST types for C15 (functions, globals, statements, expressions).

use crate::span::Span;
use crate::types::{Intrinsic, Type};

/// Identity of a declaration or expression node. Assigned by the parser in
/// source order; the type checker keys its results on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Root of a translation unit.
#[derive(Clone, Debug)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

/// Top-level item.
#[derive(Clone, Debug)]
pub enum Item {
    Function(FunctionDecl),
    Global(VarDecl),
}

/// Function declaration: `int add(int a, int b) { ... }`
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub span: Span,
    pub name: String,
    pub name_span: Span,
    pub return_ty: Type,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub ty: Type,
}

/// Variable declaration: `const float k = 1.5;` (global or local).
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub name_span: Span,
    pub ty: Type,
    pub init: Option<Expr>,
}

/// Block: `{ stmts }`
#[derive(Clone, Debug)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

/// Statement.
#[derive(Clone, Debug)]
pub enum Stmt {
    VarDecl(VarDecl),
    If {
        span: Span,
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    For {
        span: Span,
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    While {
        span: Span,
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        span: Span,
        body: Box<Stmt>,
        cond: Expr,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Return {
        span: Span,
        value: Option<Expr>,
    },
    Expr {
        span: Span,
        expr: Expr,
    },
    Block(Block),
    Empty {
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(decl) => decl.span,
            Stmt::Block(block) => block.span,
            Stmt::If { span, .. }
            | Stmt::For { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Return { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::Empty { span } => *span,
        }
    }

    /// True for statements after which control never falls through.
    pub fn diverges(&self) -> bool {
        match self {
            Stmt::Return { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => true,
            Stmt::Block(block) => block.stmts.iter().any(Stmt::diverges),
            Stmt::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => then_branch.diverges() && else_branch.diverges(),
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Int(u32),
    UInt(u32),
    Float(f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// Operators defined only on the integer families.
    pub fn is_integer_only(self) -> bool {
        matches!(
            self,
            BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnOp {
    /// Increment/decrement forms, whose operand must be a variable.
    pub fn is_update(self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
            UnOp::PreInc | UnOp::PostInc => "++",
            UnOp::PreDec | UnOp::PostDec => "--",
        }
    }
}

/// Expression.
#[derive(Clone, Debug)]
pub enum Expr {
    Literal {
        id: NodeId,
        span: Span,
        value: Literal,
    },
    Ident {
        id: NodeId,
        span: Span,
        name: String,
    },
    Binary {
        id: NodeId,
        span: Span,
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        id: NodeId,
        span: Span,
        op: UnOp,
        operand: Box<Expr>,
    },
    /// Call of a user function: `add(1, 2)`
    Call {
        id: NodeId,
        span: Span,
        callee: String,
        callee_span: Span,
        args: Vec<Expr>,
    },
    /// Call of a built-in: `_setled(x)`
    Intrinsic {
        id: NodeId,
        span: Span,
        intrinsic: Intrinsic,
        name_span: Span,
        args: Vec<Expr>,
    },
    /// Assignment `x = v`, or compound `x += v` when `op` is set.
    Assign {
        id: NodeId,
        span: Span,
        op: Option<BinOp>,
        target: String,
        target_span: Span,
        value: Box<Expr>,
    },
    /// Explicit conversion: `(float) x`
    Cast {
        id: NodeId,
        span: Span,
        ty: Type,
        expr: Box<Expr>,
    },
}

impl Expr {
    /// Span of this expression in source.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Intrinsic { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Cast { span, .. } => *span,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Expr::Literal { id, .. }
            | Expr::Ident { id, .. }
            | Expr::Binary { id, .. }
            | Expr::Unary { id, .. }
            | Expr::Call { id, .. }
            | Expr::Intrinsic { id, .. }
            | Expr::Assign { id, .. }
            | Expr::Cast { id, .. } => *id,
        }
    }
}
