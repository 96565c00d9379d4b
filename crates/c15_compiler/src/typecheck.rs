//! Type checker: assigns every expression a numeric family, resolves names to
//! their declarations and rejects mixed-family operations.

use crate::error::{CompileError, CompileResult};
use c15_syntax::ast::*;
use c15_syntax::span::Span;
use c15_syntax::types::{Family, Type};
use std::collections::{HashMap, HashSet};

/// Where a variable lives. Decides its editor symbol class and which warnings apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Global,
    Local,
    Param,
}

#[derive(Clone, Debug)]
pub struct VarInfo {
    pub decl: NodeId,
    pub name: String,
    pub ty: Type,
    pub kind: VarKind,
}

#[derive(Clone, Debug)]
pub struct Signature {
    pub params: Vec<Type>,
    pub return_ty: Type,
}

/// Side tables produced by the checker, keyed on AST node ids.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Unqualified result type of each expression.
    pub expr_types: HashMap<NodeId, Type>,
    /// Identifier, assignment and update expressions → declaring node.
    pub resolved: HashMap<NodeId, NodeId>,
    /// Every variable declaration and parameter, by node id.
    pub vars: HashMap<NodeId, VarInfo>,
    /// Declarations whose value is read somewhere.
    pub used: HashSet<NodeId>,
    pub functions: HashMap<String, Signature>,
}

impl TypeInfo {
    pub fn type_of(&self, expr: &Expr) -> Option<&Type> {
        self.expr_types.get(&expr.id())
    }

    pub fn family_of(&self, expr: &Expr) -> Option<Family> {
        self.type_of(expr).and_then(Type::family)
    }

    pub fn var_of(&self, expr: &Expr) -> Option<&VarInfo> {
        self.resolved
            .get(&expr.id())
            .and_then(|decl| self.vars.get(decl))
    }
}

pub struct TypeChecker {
    info: TypeInfo,
    scopes: Vec<HashMap<String, NodeId>>,
    current_return: Type,
    current_fn: String,
    loop_depth: usize,
    /// Set while checking a statement-level `x++`, whose result is dropped.
    value_discarded: bool,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            info: TypeInfo::default(),
            scopes: vec![HashMap::new()],
            current_return: Type::Void,
            current_fn: String::new(),
            loop_depth: 0,
            value_discarded: false,
        }
    }

    pub fn check_program(mut self, program: &Program) -> CompileResult<TypeInfo> {
        for item in &program.items {
            if let Item::Function(f) = item {
                if self.info.functions.contains_key(&f.name) {
                    return Err(CompileError::type_error(
                        format!("Function '{}' is already defined", f.name),
                        f.name_span,
                    ));
                }
                let sig = Signature {
                    params: f.params.iter().map(|p| p.ty.clone()).collect(),
                    return_ty: f.return_ty.clone(),
                };
                self.info.functions.insert(f.name.clone(), sig);
            }
        }
        let main = program.items.iter().find_map(|item| match item {
            Item::Function(f) if f.name == "main" => Some(f),
            _ => None,
        });
        let Some(main) = main else {
            return Err(CompileError::type_error(
                "No main function found",
                Span::new(0, 0),
            ));
        };
        if !main.params.is_empty() {
            return Err(CompileError::type_error(
                "Function 'main' cannot take parameters",
                main.name_span,
            ));
        }

        for item in &program.items {
            match item {
                Item::Global(decl) => self.check_var_decl(decl, VarKind::Global)?,
                Item::Function(f) => self.check_function(f)?,
            }
        }
        Ok(self.info)
    }

    fn declare(&mut self, name: &str, span: Span, info: VarInfo) -> CompileResult<()> {
        if self.scopes.len() == 1 && self.info.functions.contains_key(name) {
            return Err(CompileError::type_error(
                format!("'{}' is already declared as a function", name),
                span,
            ));
        }
        let decl = info.decl;
        let scope = self.scopes.last_mut().ok_or_else(|| {
            CompileError::type_error("Declaration outside of any scope", span)
        })?;
        if scope.contains_key(name) {
            return Err(CompileError::type_error(
                format!("'{}' is already declared in this scope", name),
                span,
            ));
        }
        scope.insert(name.to_string(), decl);
        self.info.vars.insert(decl, info);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&VarInfo> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .and_then(|decl| self.info.vars.get(decl))
    }

    fn resolve(&mut self, id: NodeId, name: &str, span: Span) -> CompileResult<VarInfo> {
        match self.lookup(name).cloned() {
            Some(var) => {
                self.info.resolved.insert(id, var.decl);
                Ok(var)
            }
            None if self.info.functions.contains_key(name) => Err(CompileError::type_error(
                format!("'{}' is a function, not a variable", name),
                span,
            )),
            None => Err(CompileError::type_error(
                format!("Unknown variable: {}", name),
                span,
            )),
        }
    }

    fn check_function(&mut self, f: &FunctionDecl) -> CompileResult<()> {
        self.current_fn = f.name.clone();
        self.current_return = f.return_ty.clone();
        self.scopes.push(HashMap::new());
        for param in &f.params {
            if param.ty.is_void() {
                return Err(CompileError::type_error(
                    format!("Parameter '{}' cannot be void", param.name),
                    param.span,
                ));
            }
            self.declare(
                &param.name,
                param.span,
                VarInfo {
                    decl: param.id,
                    name: param.name.clone(),
                    ty: param.ty.clone(),
                    kind: VarKind::Param,
                },
            )?;
        }
        // Parameters share the body's scope, so a local cannot shadow one.
        for stmt in &f.body.stmts {
            self.check_stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn check_var_decl(&mut self, decl: &VarDecl, kind: VarKind) -> CompileResult<()> {
        if decl.ty.is_void() {
            return Err(CompileError::type_error(
                format!("Variable '{}' cannot be void", decl.name),
                decl.name_span,
            ));
        }
        match &decl.init {
            Some(init) => {
                let ty = self.check_value(init)?;
                self.expect_family(&decl.ty, &ty, init.span(), || {
                    format!("Cannot initialize '{}'", decl.name)
                })?;
            }
            None if decl.ty.is_const() => {
                return Err(CompileError::type_error(
                    format!("Constant '{}' must be initialized", decl.name),
                    decl.name_span,
                ));
            }
            None => {}
        }
        self.declare(
            &decl.name,
            decl.name_span,
            VarInfo {
                decl: decl.id,
                name: decl.name.clone(),
                ty: decl.ty.clone(),
                kind,
            },
        )
    }

    fn check_block(&mut self, block: &Block) -> CompileResult<()> {
        self.scopes.push(HashMap::new());
        for stmt in &block.stmts {
            self.check_stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn check_loop_body(&mut self, body: &Stmt) -> CompileResult<()> {
        self.loop_depth += 1;
        let result = self.check_stmt(body);
        self.loop_depth -= 1;
        result
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::VarDecl(decl) => self.check_var_decl(decl, VarKind::Local),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_value(cond)?;
                self.check_scoped(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.check_scoped(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                self.check_value(cond)?;
                self.check_loop_body(body)
            }
            Stmt::DoWhile { body, cond, .. } => {
                self.check_loop_body(body)?;
                self.check_value(cond)?;
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.check_stmt(init)?;
                }
                if let Some(cond) = cond {
                    self.check_value(cond)?;
                }
                if let Some(step) = step {
                    self.check_effect(step)?;
                }
                self.check_loop_body(body)?;
                self.scopes.pop();
                Ok(())
            }
            Stmt::Break { span } | Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    let keyword = if matches!(stmt, Stmt::Break { .. }) {
                        "break"
                    } else {
                        "continue"
                    };
                    return Err(CompileError::type_error(
                        format!("'{}' outside of a loop", keyword),
                        *span,
                    ));
                }
                Ok(())
            }
            Stmt::Return { span, value } => self.check_return(*span, value.as_ref()),
            Stmt::Expr { expr, .. } => self.check_effect(expr),
            Stmt::Block(block) => self.check_block(block),
            Stmt::Empty { .. } => Ok(()),
        }
    }

    /// A branch body gets its own scope even without braces.
    fn check_scoped(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.scopes.push(HashMap::new());
        let result = self.check_stmt(stmt);
        self.scopes.pop();
        result
    }

    fn check_return(&mut self, span: Span, value: Option<&Expr>) -> CompileResult<()> {
        let expected = self.current_return.clone();
        match (value, expected.is_void()) {
            (None, true) => Ok(()),
            (Some(value), true) => Err(CompileError::type_error(
                format!("Void function '{}' cannot return a value", self.current_fn),
                value.span(),
            )),
            (None, false) => Err(CompileError::type_error(
                format!(
                    "Function '{}' must return a value of type {}",
                    self.current_fn, expected
                ),
                span,
            )),
            (Some(value), false) => {
                let ty = self.check_value(value)?;
                let name = self.current_fn.clone();
                self.expect_family(&expected, &ty, value.span(), || {
                    format!("Return type mismatch in '{}'", name)
                })
            }
        }
    }

    fn expect_family(
        &self,
        expected: &Type,
        actual: &Type,
        span: Span,
        context: impl FnOnce() -> String,
    ) -> CompileResult<()> {
        if expected.family() == actual.family() {
            return Ok(());
        }
        Err(CompileError::type_error(
            format!(
                "{}: expected {}, got {}",
                context(),
                expected.base(),
                actual.base()
            ),
            span,
        ))
    }

    /// Check an expression whose value is consumed; `void` is rejected.
    fn check_value(&mut self, expr: &Expr) -> CompileResult<Type> {
        let ty = self.check_expr(expr)?;
        if ty.is_void() {
            return Err(CompileError::type_error(
                "Void value cannot be used in an expression",
                expr.span(),
            ));
        }
        Ok(ty)
    }

    fn family(&mut self, expr: &Expr) -> CompileResult<Family> {
        let ty = self.check_value(expr)?;
        ty.family().ok_or_else(|| {
            CompileError::type_error("Expression has no numeric type", expr.span())
        })
    }

    /// Check an expression whose value is dropped. A bare update writes its
    /// variable without reading it.
    fn check_effect(&mut self, expr: &Expr) -> CompileResult<()> {
        self.value_discarded = matches!(expr, Expr::Unary { op, .. } if op.is_update());
        let result = self.check_expr(expr);
        self.value_discarded = false;
        result.map(|_| ())
    }

    fn check_expr(&mut self, expr: &Expr) -> CompileResult<Type> {
        let ty = self.infer(expr)?;
        self.info.expr_types.insert(expr.id(), ty.clone());
        Ok(ty)
    }

    fn infer(&mut self, expr: &Expr) -> CompileResult<Type> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Int(_) => Type::Int,
                Literal::UInt(_) => Type::UInt,
                Literal::Float(_) => Type::Float,
            }),
            Expr::Ident { id, span, name } => {
                let var = self.resolve(*id, name, *span)?;
                self.info.used.insert(var.decl);
                Ok(var.ty.base().clone())
            }
            Expr::Binary {
                span, op, lhs, rhs, ..
            } => {
                let left = self.family(lhs)?;
                let right = self.family(rhs)?;
                if left != right {
                    return Err(CompileError::type_error(
                        format!(
                            "Type mismatch: '{}' operands are {} and {}",
                            op.symbol(),
                            left,
                            right
                        ),
                        *span,
                    ));
                }
                if op.is_integer_only() && !left.is_integer() {
                    return Err(CompileError::type_error(
                        format!("Operator '{}' is not defined for float", op.symbol()),
                        *span,
                    ));
                }
                if op.is_comparison() || op.is_logical() {
                    Ok(Type::Int)
                } else {
                    Ok(left.ty())
                }
            }
            Expr::Unary {
                span, op, operand, ..
            } => {
                if op.is_update() {
                    let Expr::Ident { id, span: name_span, name } = operand.as_ref() else {
                        return Err(CompileError::type_error(
                            format!("Operand of '{}' must be a variable", op.symbol()),
                            *span,
                        ));
                    };
                    let var = self.resolve(*id, name, *name_span)?;
                    self.info.resolved.insert(expr.id(), var.decl);
                    if !self.value_discarded {
                        self.info.used.insert(var.decl);
                    }
                    if var.ty.is_const() {
                        return Err(CompileError::type_error(
                            format!("Cannot modify constant '{}'", name),
                            *span,
                        ));
                    }
                    let ty = var.ty.base().clone();
                    self.info.expr_types.insert(operand.id(), ty.clone());
                    return Ok(ty);
                }
                let family = self.family(operand)?;
                match op {
                    UnOp::Not => Ok(Type::Int),
                    UnOp::BitNot if !family.is_integer() => Err(CompileError::type_error(
                        "Operator '~' is not defined for float",
                        *span,
                    )),
                    _ => Ok(family.ty()),
                }
            }
            Expr::Assign {
                id,
                op,
                target,
                target_span,
                value,
                ..
            } => {
                let var = self.resolve(*id, target, *target_span)?;
                if var.ty.is_const() {
                    return Err(CompileError::type_error(
                        format!("Cannot assign to constant '{}'", target),
                        *target_span,
                    ));
                }
                let ty = self.check_value(value)?;
                self.expect_family(&var.ty, &ty, value.span(), || {
                    format!("Cannot assign to '{}'", target)
                })?;
                if let Some(op) = op {
                    self.info.used.insert(var.decl);
                    if op.is_integer_only() && var.ty.family() == Some(Family::Float) {
                        return Err(CompileError::type_error(
                            format!("Operator '{}=' is not defined for float", op.symbol()),
                            *target_span,
                        ));
                    }
                }
                Ok(var.ty.base().clone())
            }
            Expr::Call {
                span,
                callee,
                callee_span,
                args,
                ..
            } => {
                let Some(sig) = self.info.functions.get(callee).cloned() else {
                    let message = if self.lookup(callee).is_some() {
                        format!("'{}' is a variable, not a function", callee)
                    } else {
                        format!("Unknown function: {}", callee)
                    };
                    return Err(CompileError::type_error(message, *callee_span));
                };
                if sig.params.len() != args.len() {
                    return Err(CompileError::type_error(
                        format!(
                            "Function '{}' expects {} argument(s), got {}",
                            callee,
                            sig.params.len(),
                            args.len()
                        ),
                        *span,
                    ));
                }
                for (i, (param, arg)) in sig.params.iter().zip(args).enumerate() {
                    let ty = self.check_value(arg)?;
                    self.expect_family(param, &ty, arg.span(), || {
                        format!("Argument {} of '{}'", i + 1, callee)
                    })?;
                }
                Ok(sig.return_ty.base().clone())
            }
            Expr::Intrinsic {
                span,
                intrinsic,
                args,
                ..
            } => {
                if args.len() != intrinsic.arity() {
                    return Err(CompileError::type_error(
                        format!(
                            "'{}' expects {} argument(s), got {}",
                            intrinsic.name(),
                            intrinsic.arity(),
                            args.len()
                        ),
                        *span,
                    ));
                }
                for arg in args {
                    self.check_value(arg)?;
                }
                Ok(intrinsic.result_type())
            }
            Expr::Cast { ty, expr, .. } => {
                self.check_value(expr)?;
                Ok(ty.base().clone())
            }
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a parsed program, returning the node-keyed type tables.
pub fn check(program: &Program) -> CompileResult<TypeInfo> {
    TypeChecker::new().check_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn check_src(src: &str) -> CompileResult<TypeInfo> {
        let program = parse(tokenize(src)?)?;
        check(&program)
    }

    fn error_of(src: &str) -> CompileError {
        match check_src(src) {
            Ok(_) => panic!("expected a type error for {:?}", src),
            Err(e) => e,
        }
    }

    #[test]
    fn accepts_well_typed_program() {
        let src = r#"
const uint MASK = 0xFFu;
float scale(float x, float k) { return x * k; }
int main() {
    int i = 0;
    uint acc = 0u;
    for (i = 0; i < 10; i++) { acc += (uint) i & MASK; }
    float f = scale((float) i, 0.5);
    if (f > 2.0 && !(i == 3)) { _setled(acc); }
    return i;
}
"#;
        let info = check_src(src).unwrap();
        assert_eq!(info.functions["scale"].params, vec![Type::Float, Type::Float]);
        assert!(info.vars.values().any(|v| v.name == "MASK" && v.kind == VarKind::Global));
    }

    #[test]
    fn rejects_mixed_families() {
        let err = error_of("void main() { int a = 1; float b = 2.0; a + b; }");
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.message, "Type mismatch: '+' operands are int and float");
    }

    #[test]
    fn signed_and_unsigned_do_not_mix() {
        let err = error_of("void main() { uint u = 1; }");
        assert_eq!(err.message, "Cannot initialize 'u': expected uint, got int");
    }

    #[test]
    fn casts_change_family() {
        assert!(check_src("void main() { uint u = (uint) 1; float f = (float) u; }").is_ok());
    }

    #[test]
    fn const_cannot_be_modified() {
        let err = error_of("const int K = 1; void main() { K = 2; }");
        assert_eq!(err.message, "Cannot assign to constant 'K'");
        let err = error_of("void main() { const int k = 1; k++; }");
        assert_eq!(err.message, "Cannot modify constant 'k'");
        let err = error_of("const float F; void main() { }");
        assert_eq!(err.message, "Constant 'F' must be initialized");
    }

    #[test]
    fn float_rejects_integer_only_operators() {
        let err = error_of("void main() { float f = 1.0; f % 2.0; }");
        assert_eq!(err.message, "Operator '%' is not defined for float");
        let err = error_of("void main() { float f = 1.0; f <<= 1.0; }");
        assert_eq!(err.message, "Operator '<<=' is not defined for float");
        let err = error_of("void main() { ~1.0; }");
        assert_eq!(err.message, "Operator '~' is not defined for float");
    }

    #[test]
    fn comparisons_yield_int() {
        let src = "void main() { float a = 1.0; int t = a < 2.0; }";
        assert!(check_src(src).is_ok());
    }

    #[test]
    fn main_is_required() {
        let err = error_of("int helper() { return 1; }");
        assert_eq!(err.message, "No main function found");
    }

    #[test]
    fn break_outside_loop() {
        let err = error_of("void main() { break; }");
        assert_eq!(err.message, "'break' outside of a loop");
        assert!(check_src("void main() { while (1) { if (1) break; } }").is_ok());
    }

    #[test]
    fn call_checks_arity_and_arguments() {
        let prelude = "int add(int a, int b) { return a + b; } ";
        let err = error_of(&format!("{}void main() {{ add(1); }}", prelude));
        assert_eq!(err.message, "Function 'add' expects 2 argument(s), got 1");
        let err = error_of(&format!("{}void main() {{ add(1, 2u); }}", prelude));
        assert_eq!(err.message, "Argument 2 of 'add': expected int, got uint");
        let err = error_of("void main() { missing(); }");
        assert_eq!(err.message, "Unknown function: missing");
    }

    #[test]
    fn return_must_match_function() {
        let err = error_of("int f() { return 1.5; } void main() { f(); }");
        assert_eq!(err.message, "Return type mismatch in 'f': expected int, got float");
        let err = error_of("void main() { return 1; }");
        assert_eq!(err.message, "Void function 'main' cannot return a value");
        let err = error_of("int f() { return; } void main() { f(); }");
        assert_eq!(err.message, "Function 'f' must return a value of type int");
    }

    #[test]
    fn void_values_are_not_operands() {
        let err = error_of("void g() { } void main() { int x = g(); }");
        assert_eq!(err.message, "Void value cannot be used in an expression");
        let err = error_of("void main() { _setled(1) + 1; }");
        assert_eq!(err.message, "Void value cannot be used in an expression");
    }

    #[test]
    fn names_resolve_through_scopes() {
        let err = error_of("void main() { { int x = 1; } x = 2; }");
        assert_eq!(err.message, "Unknown variable: x");
        let err = error_of("void main() { int x = 1; int x = 2; }");
        assert_eq!(err.message, "'x' is already declared in this scope");
        assert!(check_src("int x; void main() { float x = 1.0; x = 2.0; }").is_ok());
    }

    #[test]
    fn intrinsic_arity_and_results() {
        let err = error_of("void main() { _setled(); }");
        assert_eq!(err.message, "'_setled' expects 1 argument(s), got 0");
        assert!(check_src("void main() { uint t = _tick(); float f = _pop_float(); }").is_ok());
    }

    #[test]
    fn reads_are_tracked() {
        let src = "void main() { int unused = 1; int used = 2; _push(used); }";
        let program = parse(tokenize(src).unwrap()).unwrap();
        let info = check(&program).unwrap();
        let names: Vec<&str> = info
            .used
            .iter()
            .map(|decl| info.vars[decl].name.as_str())
            .collect();
        assert_eq!(names, vec!["used"]);
    }

    #[test]
    fn dropped_updates_are_not_reads() {
        let src = "void main() { int bumped = 0; bumped++; --bumped; int kept = 0; int copy = kept++; _push(copy); for (int i = 0; 1; i++) { } }";
        let program = parse(tokenize(src).unwrap()).unwrap();
        let info = check(&program).unwrap();
        let mut names: Vec<&str> = info
            .used
            .iter()
            .map(|decl| info.vars[decl].name.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["copy", "kept"]);
    }
}
