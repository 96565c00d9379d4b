//! Parser: tokens → AST. Recursive descent with C operator precedence; the
//! first syntax error aborts the parse.

use crate::error::{CompileError, CompileResult};
use c15_syntax::ast::*;
use c15_syntax::span::Span;
use c15_syntax::token::{Token, TokenKind};
use c15_syntax::types::Type;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    last_span: Span,
    next_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            last_span: Span::default(),
            next_id: 0,
        }
    }

    fn peek(&self) -> &TokenKind {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        static EOF: TokenKind = TokenKind::Eof;
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&EOF)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or(self.last_span)
    }

    fn peek_lexeme(&self) -> &str {
        self.tokens
            .get(self.pos)
            .map(|t| t.lexeme.as_str())
            .unwrap_or("")
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos)?.clone();
        if !t.is_eof() {
            self.pos += 1;
        }
        self.last_span = t.span;
        Some(t)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let found = match self.peek() {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("'{}'", self.peek_lexeme()),
        };
        CompileError::syntax(
            format!("Expected {}, found {}", expected, found),
            self.peek_span(),
        )
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> CompileResult<Span> {
        if self.check(&kind) {
            self.next();
            Ok(self.last_span)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self, what: &str) -> CompileResult<(String, Span)> {
        if let TokenKind::Ident(name) = self.peek() {
            let name = name.clone();
            self.next();
            Ok((name, self.last_span))
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_semicolon(&mut self) -> CompileResult<()> {
        if self.eat(&TokenKind::Semicolon) {
            Ok(())
        } else {
            Err(CompileError::syntax(
                "Expected ';' after statement",
                self.last_span,
            ))
        }
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.last_span.end.max(start))
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn reject_struct(&self) -> CompileError {
        CompileError::syntax("struct declarations are not supported", self.peek_span())
    }

    pub fn parse_program(&mut self) -> CompileResult<Program> {
        let mut items = Vec::new();
        while !matches!(self.peek(), TokenKind::Eof) {
            if matches!(self.peek(), TokenKind::Struct) {
                return Err(self.reject_struct());
            }
            items.push(self.parse_item()?);
        }
        Ok(Program {
            items,
            span: Span::new(0, self.last_span.end),
        })
    }

    fn parse_item(&mut self) -> CompileResult<Item> {
        let start = self.peek_span().start;
        let ty = self.parse_type()?;
        let (name, name_span) = self.expect_ident("a function or variable name")?;
        if matches!(self.peek(), TokenKind::LParen) {
            if ty.is_const() {
                return Err(CompileError::syntax(
                    "Function return type cannot be const",
                    self.span_from(start),
                ));
            }
            return Ok(Item::Function(
                self.parse_function(start, ty, name, name_span)?,
            ));
        }
        Ok(Item::Global(self.finish_var_decl(start, ty, name, name_span)?))
    }

    fn parse_function(
        &mut self,
        start: u32,
        return_ty: Type,
        name: String,
        name_span: Span,
    ) -> CompileResult<FunctionDecl> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if matches!(self.peek(), TokenKind::Void) && matches!(self.peek_nth(1), TokenKind::RParen)
        {
            self.next();
        }
        while !matches!(self.peek(), TokenKind::RParen) {
            let param_start = self.peek_span().start;
            let ty = self.parse_type()?;
            let (param_name, _) = self.expect_ident("a parameter name")?;
            params.push(Param {
                id: self.fresh_id(),
                span: self.span_from(param_start),
                name: param_name,
                ty,
            });
            if !matches!(self.peek(), TokenKind::RParen) {
                self.expect(TokenKind::Comma, "',' or ')'")?;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            span: self.span_from(start),
            name,
            name_span,
            return_ty,
            params,
            body,
        })
    }

    fn parse_type(&mut self) -> CompileResult<Type> {
        let is_const = self.eat(&TokenKind::Const);
        let base = match self.peek() {
            TokenKind::Int => Type::Int,
            TokenKind::UInt => Type::UInt,
            TokenKind::Float => Type::Float,
            TokenKind::Void if !is_const => Type::Void,
            TokenKind::Struct => return Err(self.reject_struct()),
            _ => return Err(self.unexpected("a type")),
        };
        self.next();
        Ok(if is_const { Type::constant(base) } else { base })
    }

    fn parse_var_decl(&mut self) -> CompileResult<VarDecl> {
        let start = self.peek_span().start;
        let ty = self.parse_type()?;
        let (name, name_span) = self.expect_ident("a variable name")?;
        self.finish_var_decl(start, ty, name, name_span)
    }

    fn finish_var_decl(
        &mut self,
        start: u32,
        ty: Type,
        name: String,
        name_span: Span,
    ) -> CompileResult<VarDecl> {
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok(VarDecl {
            id: self.fresh_id(),
            span: self.span_from(start),
            name,
            name_span,
            ty,
            init,
        })
    }

    fn parse_block(&mut self) -> CompileResult<Block> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.start;
        let mut stmts = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Block {
            stmts,
            span: self.span_from(start),
        })
    }

    fn parse_paren_expr(&mut self) -> CompileResult<Expr> {
        self.expect(TokenKind::LParen, "'('")?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(expr)
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let start = self.peek_span().start;
        match self.peek() {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.next();
                Ok(Stmt::Empty {
                    span: self.last_span,
                })
            }
            TokenKind::Struct => Err(self.reject_struct()),
            kind if kind.is_type_keyword() => Ok(Stmt::VarDecl(self.parse_var_decl()?)),
            TokenKind::If => {
                self.next();
                let cond = self.parse_paren_expr()?;
                let then_branch = Box::new(self.parse_stmt()?);
                let else_branch = if self.eat(&TokenKind::Else) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    span: self.span_from(start),
                    cond,
                    then_branch,
                    else_branch,
                })
            }
            TokenKind::While => {
                self.next();
                let cond = self.parse_paren_expr()?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::While {
                    span: self.span_from(start),
                    cond,
                    body,
                })
            }
            TokenKind::Do => {
                self.next();
                let body = Box::new(self.parse_stmt()?);
                self.expect(TokenKind::While, "'while' after do body")?;
                let cond = self.parse_paren_expr()?;
                self.expect_semicolon()?;
                Ok(Stmt::DoWhile {
                    span: self.span_from(start),
                    body,
                    cond,
                })
            }
            TokenKind::For => {
                self.next();
                self.expect(TokenKind::LParen, "'(' after for")?;
                let init = if self.eat(&TokenKind::Semicolon) {
                    None
                } else if self.peek().is_type_keyword() {
                    Some(Box::new(Stmt::VarDecl(self.parse_var_decl()?)))
                } else {
                    let expr_start = self.peek_span().start;
                    let expr = self.parse_expr()?;
                    self.expect_semicolon()?;
                    Some(Box::new(Stmt::Expr {
                        span: self.span_from(expr_start),
                        expr,
                    }))
                };
                let cond = if matches!(self.peek(), TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon, "';' after for condition")?;
                let step = if matches!(self.peek(), TokenKind::RParen) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::RParen, "')'")?;
                let body = Box::new(self.parse_stmt()?);
                Ok(Stmt::For {
                    span: self.span_from(start),
                    init,
                    cond,
                    step,
                    body,
                })
            }
            TokenKind::Break => {
                self.next();
                self.expect_semicolon()?;
                Ok(Stmt::Break {
                    span: self.span_from(start),
                })
            }
            TokenKind::Continue => {
                self.next();
                self.expect_semicolon()?;
                Ok(Stmt::Continue {
                    span: self.span_from(start),
                })
            }
            TokenKind::Return => {
                self.next();
                let value = if matches!(self.peek(), TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect_semicolon()?;
                Ok(Stmt::Return {
                    span: self.span_from(start),
                    value,
                })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect_semicolon()?;
                Ok(Stmt::Expr {
                    span: self.span_from(start),
                    expr,
                })
            }
        }
    }

    pub fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_assignment()
    }

    fn assign_op(&self) -> Option<Option<BinOp>> {
        let op = match self.peek() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            TokenKind::PercentAssign => Some(BinOp::Rem),
            TokenKind::AmpAssign => Some(BinOp::BitAnd),
            TokenKind::PipeAssign => Some(BinOp::BitOr),
            TokenKind::CaretAssign => Some(BinOp::BitXor),
            TokenKind::ShlAssign => Some(BinOp::Shl),
            TokenKind::ShrAssign => Some(BinOp::Shr),
            _ => return None,
        };
        Some(op)
    }

    /// Assignment is right-associative and only targets plain variables.
    fn parse_assignment(&mut self) -> CompileResult<Expr> {
        let lhs = self.parse_expr_bp(0)?;
        let Some(op) = self.assign_op() else {
            return Ok(lhs);
        };
        let lhs_span = lhs.span();
        let Expr::Ident {
            name, span: target_span, ..
        } = lhs
        else {
            return Err(CompileError::syntax(
                "Assignment target must be a variable",
                lhs_span,
            ));
        };
        self.next();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            id: self.fresh_id(),
            span: target_span.merge(value.span()),
            op,
            target: name,
            target_span,
            value: Box::new(value),
        })
    }

    /// Binding power for infix: (op, left_bp, right_bp). Higher = tighter. Left-assoc: right_bp = left_bp + 1.
    fn infix_binding_power(&self) -> Option<(BinOp, u8, u8)> {
        let (op, prec) = match self.peek() {
            TokenKind::OrOr => (BinOp::Or, 1),
            TokenKind::AndAnd => (BinOp::And, 2),
            TokenKind::Pipe => (BinOp::BitOr, 3),
            TokenKind::Caret => (BinOp::BitXor, 4),
            TokenKind::Amp => (BinOp::BitAnd, 5),
            TokenKind::Eq => (BinOp::Eq, 6),
            TokenKind::Ne => (BinOp::Ne, 6),
            TokenKind::Lt => (BinOp::Lt, 7),
            TokenKind::Le => (BinOp::Le, 7),
            TokenKind::Gt => (BinOp::Gt, 7),
            TokenKind::Ge => (BinOp::Ge, 7),
            TokenKind::Shl => (BinOp::Shl, 8),
            TokenKind::Shr => (BinOp::Shr, 8),
            TokenKind::Plus => (BinOp::Add, 9),
            TokenKind::Minus => (BinOp::Sub, 9),
            TokenKind::Star => (BinOp::Mul, 10),
            TokenKind::Slash => (BinOp::Div, 10),
            TokenKind::Percent => (BinOp::Rem, 10),
            _ => return None,
        };
        Some((op, prec * 2, prec * 2 + 1))
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> CompileResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let Some((op, left_bp, right_bp)) = self.infix_binding_power() else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            self.next(); // consume op
            let right = self.parse_expr_bp(right_bp)?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                id: self.fresh_id(),
                span,
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    fn is_cast(&self) -> bool {
        matches!(self.peek(), TokenKind::LParen)
            && matches!(
                self.peek_nth(1),
                TokenKind::Int | TokenKind::UInt | TokenKind::Float
            )
            && matches!(self.peek_nth(2), TokenKind::RParen)
    }

    fn parse_unary(&mut self) -> CompileResult<Expr> {
        let start = self.peek_span().start;
        if self.is_cast() {
            self.next();
            let ty = self.parse_type()?;
            self.next(); // )
            let expr = self.parse_unary()?;
            return Ok(Expr::Cast {
                id: self.fresh_id(),
                span: self.span_from(start),
                ty,
                expr: Box::new(expr),
            });
        }
        let op = match self.peek() {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Not => UnOp::Not,
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::PlusPlus => UnOp::PreInc,
            TokenKind::MinusMinus => UnOp::PreDec,
            TokenKind::Plus => {
                self.next();
                return self.parse_unary();
            }
            _ => return self.parse_postfix(),
        };
        self.next();
        let operand = self.parse_unary()?;
        let span = self.span_from(start);
        if op == UnOp::Neg {
            if let Expr::Literal { id, value, .. } = operand {
                return Ok(Expr::Literal {
                    id,
                    span,
                    value: negate_literal(value),
                });
            }
        }
        self.make_unary(op, operand, span)
    }

    fn make_unary(&mut self, op: UnOp, operand: Expr, span: Span) -> CompileResult<Expr> {
        if op.is_update() && !matches!(operand, Expr::Ident { .. }) {
            return Err(CompileError::syntax(
                format!("Operand of '{}' must be a variable", op.symbol()),
                operand.span(),
            ));
        }
        Ok(Expr::Unary {
            id: self.fresh_id(),
            span,
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                TokenKind::PlusPlus => UnOp::PostInc,
                TokenKind::MinusMinus => UnOp::PostDec,
                _ => break,
            };
            self.next();
            let span = expr.span().merge(self.last_span);
            expr = self.make_unary(op, expr, span)?;
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> CompileResult<Vec<Expr>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        while !matches!(self.peek(), TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if !matches!(self.peek(), TokenKind::RParen) {
                self.expect(TokenKind::Comma, "',' or ')'")?;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let start = self.peek_span().start;
        let value = match self.peek() {
            TokenKind::IntLiteral(v) => Some(Literal::Int(*v)),
            TokenKind::UIntLiteral(v) => Some(Literal::UInt(*v)),
            TokenKind::FloatLiteral(v) => Some(Literal::Float(*v)),
            _ => None,
        };
        if let Some(value) = value {
            self.next();
            return Ok(Expr::Literal {
                id: self.fresh_id(),
                span: self.last_span,
                value,
            });
        }
        match self.peek().clone() {
            TokenKind::LParen => {
                self.next();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Intrinsic(intrinsic) => {
                self.next();
                let name_span = self.last_span;
                let args = self.parse_args()?;
                Ok(Expr::Intrinsic {
                    id: self.fresh_id(),
                    span: self.span_from(start),
                    intrinsic,
                    name_span,
                    args,
                })
            }
            TokenKind::Ident(name) => {
                self.next();
                let name_span = self.last_span;
                if matches!(self.peek(), TokenKind::LParen) {
                    let args = self.parse_args()?;
                    Ok(Expr::Call {
                        id: self.fresh_id(),
                        span: self.span_from(start),
                        callee: name,
                        callee_span: name_span,
                        args,
                    })
                } else {
                    Ok(Expr::Ident {
                        id: self.fresh_id(),
                        span: name_span,
                        name,
                    })
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

fn negate_literal(value: Literal) -> Literal {
    match value {
        Literal::Int(v) => Literal::Int(v.wrapping_neg()),
        Literal::UInt(v) => Literal::UInt(v.wrapping_neg()),
        Literal::Float(f) => Literal::Float(-f),
    }
}

/// Parse a token stream into a program.
pub fn parse(tokens: Vec<Token>) -> CompileResult<Program> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> CompileResult<Program> {
        parse(tokenize(src)?)
    }

    fn main_body(program: &Program) -> &[Stmt] {
        for item in &program.items {
            if let Item::Function(f) = item {
                if f.name == "main" {
                    return &f.body.stmts;
                }
            }
        }
        panic!("no main")
    }

    fn first_expr(src: &str) -> Expr {
        let program = parse_src(src).unwrap();
        match &main_body(&program)[0] {
            Stmt::Expr { expr, .. } => expr.clone(),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn parse_functions_and_globals() {
        let src = r#"
const int LIMIT = 10;
uint seed;
int add(int a, int b) { return a + b; }
void main(void) { add(1, 2); }
"#;
        let program = parse_src(src).unwrap();
        assert_eq!(program.items.len(), 4);
        let Item::Global(limit) = &program.items[0] else {
            panic!("expected global")
        };
        assert_eq!(limit.ty, Type::constant(Type::Int));
        let Item::Function(add) = &program.items[2] else {
            panic!("expected function")
        };
        assert_eq!(add.params.len(), 2);
        assert_eq!(add.return_ty, Type::Int);
        let Item::Function(main) = &program.items[3] else {
            panic!("expected function")
        };
        assert!(main.params.is_empty());
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = first_expr("void main() { 1 + 2 * 3; }");
        let Expr::Binary { op, rhs, .. } = expr else {
            panic!("expected binary")
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(*rhs, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = first_expr("void main() { 8 - 4 - 2; }");
        let Expr::Binary { op, lhs, rhs, .. } = expr else {
            panic!("expected binary")
        };
        assert_eq!(op, BinOp::Sub);
        assert!(matches!(*lhs, Expr::Binary { op: BinOp::Sub, .. }));
        assert!(matches!(*rhs, Expr::Literal { .. }));
    }

    #[test]
    fn assignment_is_right_associative() {
        let expr = first_expr("void main() { a = b += 2; }");
        let Expr::Assign { op, target, value, .. } = expr else {
            panic!("expected assignment")
        };
        assert_eq!(op, None);
        assert_eq!(target, "a");
        assert!(matches!(
            *value,
            Expr::Assign {
                op: Some(BinOp::Add),
                ..
            }
        ));
    }

    #[test]
    fn negative_literals_are_folded() {
        let expr = first_expr("void main() { -5; }");
        assert!(matches!(
            expr,
            Expr::Literal {
                value: Literal::Int(v),
                ..
            } if v == (-5i32) as u32
        ));
    }

    #[test]
    fn casts_and_postfix_updates() {
        let expr = first_expr("void main() { (float) i++; }");
        let Expr::Cast { ty, expr, .. } = expr else {
            panic!("expected cast")
        };
        assert_eq!(ty, Type::Float);
        assert!(matches!(
            *expr,
            Expr::Unary {
                op: UnOp::PostInc,
                ..
            }
        ));
    }

    #[test]
    fn control_flow_statements() {
        let src = r#"
void main() {
    for (int i = 0; i < 10; i++) { if (i == 3) continue; else break; }
    while (1) ;
    do { } while (0);
    for (;;) break;
}
"#;
        let program = parse_src(src).unwrap();
        let body = main_body(&program);
        assert!(matches!(body[0], Stmt::For { .. }));
        assert!(matches!(body[1], Stmt::While { .. }));
        assert!(matches!(body[2], Stmt::DoWhile { .. }));
        let Stmt::For {
            init, cond, step, ..
        } = &body[3]
        else {
            panic!("expected for")
        };
        assert!(init.is_none() && cond.is_none() && step.is_none());
    }

    #[test]
    fn intrinsic_calls_parse() {
        let expr = first_expr("void main() { _setled(_pop_int()); }");
        let Expr::Intrinsic { args, .. } = expr else {
            panic!("expected intrinsic")
        };
        assert!(matches!(args[0], Expr::Intrinsic { .. }));
    }

    #[test]
    fn semicolon_required_after_statement() {
        let err = parse_src("void main() { int x = 1 }").unwrap_err();
        assert!(err.message.contains("Expected ';' after statement"));
    }

    #[test]
    fn assignment_to_non_variable_is_rejected() {
        let err = parse_src("void main() { 1 = 2; }").unwrap_err();
        assert_eq!(err.message, "Assignment target must be a variable");
    }

    #[test]
    fn increment_of_non_variable_is_rejected() {
        assert!(parse_src("void main() { 3++; }").is_err());
    }

    #[test]
    fn struct_is_reserved() {
        let err = parse_src("struct point { int x; };").unwrap_err();
        assert_eq!(err.message, "struct declarations are not supported");
        assert_eq!(err.span, Span::new(0, 6));
    }

    #[test]
    fn first_error_location_is_reported() {
        let err = parse_src("void main() { int = 3; }").unwrap_err();
        assert_eq!(err.message, "Expected a variable name, found '='");
        assert_eq!(err.span, Span::new(18, 19));
    }
}
