//! Code generation: typed AST → assembly lines on a stack machine.
//!
//! Every expression leaves exactly one value on the hardware stack (none for
//! `void`). Operators move their operands into the A/B registers with
//! `GETPOPB`/`GETPOPA`, compute into R and push R back with `SAVEPUSH`.
//! Variables, parameters and return values live in static data slots.

use super::select;
use crate::error::{CompileError, CompileResult};
use crate::typecheck::{TypeInfo, VarKind};
use c15_syntax::ast::*;
use c15_syntax::diagnostics::{at, Diagnostic};
use c15_syntax::ir::{Address, AsmLine, Destination, Instruction, Label, Value, MAX_ADDRESS};
use c15_syntax::span::{FileId, Span};
use c15_syntax::symbols::{Symbol, SymbolClass};
use c15_syntax::types::{Family, Intrinsic, Type};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Output of code generation.
#[derive(Debug, Default)]
pub struct Lowered {
    pub lines: Vec<AsmLine>,
    pub destinations: Vec<Destination>,
    pub symbols: Vec<Symbol>,
    pub warnings: Vec<Diagnostic>,
}

struct Frame {
    params: Vec<Address>,
    ret: Option<Address>,
}

struct LoopLabels {
    break_to: Label,
    continue_to: Label,
}

pub struct CodeGenerator<'a> {
    info: &'a TypeInfo,
    out: Lowered,
    slots: HashMap<NodeId, Address>,
    frames: HashMap<String, Frame>,
    next_address: u32,
    next_label: u32,
    loops: Vec<LoopLabels>,
    current_fn: String,
    /// Direct callees of each function.
    calls: HashMap<String, BTreeSet<String>>,
}

fn function_label(name: &str) -> Label {
    Label::new(format!("fn_{}", name))
}

fn stmt_calls(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match stmt {
        Stmt::VarDecl(decl) => {
            if let Some(init) = &decl.init {
                expr_calls(init, out);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            expr_calls(cond, out);
            stmt_calls(then_branch, out);
            if let Some(else_branch) = else_branch {
                stmt_calls(else_branch, out);
            }
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
            ..
        } => {
            if let Some(init) = init {
                stmt_calls(init, out);
            }
            for e in cond.iter().chain(step) {
                expr_calls(e, out);
            }
            stmt_calls(body, out);
        }
        Stmt::While { cond, body, .. } | Stmt::DoWhile { body, cond, .. } => {
            expr_calls(cond, out);
            stmt_calls(body, out);
        }
        Stmt::Return { value: Some(e), .. } | Stmt::Expr { expr: e, .. } => expr_calls(e, out),
        Stmt::Block(block) => {
            for s in &block.stmts {
                stmt_calls(s, out);
            }
        }
        Stmt::Return { value: None, .. }
        | Stmt::Break { .. }
        | Stmt::Continue { .. }
        | Stmt::Empty { .. } => {}
    }
}

fn expr_calls(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Literal { .. } | Expr::Ident { .. } => {}
        Expr::Binary { lhs, rhs, .. } => {
            expr_calls(lhs, out);
            expr_calls(rhs, out);
        }
        Expr::Unary { operand: e, .. }
        | Expr::Assign { value: e, .. }
        | Expr::Cast { expr: e, .. } => expr_calls(e, out),
        Expr::Call { callee, args, .. } => {
            out.insert(callee.clone());
            for arg in args {
                expr_calls(arg, out);
            }
        }
        Expr::Intrinsic { args, .. } => {
            for arg in args {
                expr_calls(arg, out);
            }
        }
    }
}

fn family_err(span: Span) -> CompileError {
    CompileError::codegen("Expression has no numeric type", span)
}

impl<'a> CodeGenerator<'a> {
    pub fn new(info: &'a TypeInfo) -> Self {
        Self {
            info,
            out: Lowered::default(),
            slots: HashMap::new(),
            frames: HashMap::new(),
            next_address: 0,
            next_label: 0,
            loops: Vec::new(),
            current_fn: String::new(),
            calls: HashMap::new(),
        }
    }

    fn emit(&mut self, instr: Instruction) {
        self.out.lines.push(AsmLine::Instr(instr));
    }

    fn place(&mut self, label: Label) {
        self.out.lines.push(AsmLine::Label(label));
    }

    fn symbol(&mut self, span: Span, class: SymbolClass) {
        self.out.symbols.push(Symbol::new(span, class));
    }

    fn warn(&mut self, message: impl Into<String>, span: Span) {
        self.out
            .warnings
            .push(Diagnostic::warning(message, at(FileId::SOURCE, span)));
    }

    /// Labels of one construct share a number: `while_head_3`, `while_end_3`.
    fn fresh_labels<const N: usize>(&mut self, kinds: [&str; N]) -> [Label; N] {
        let n = self.next_label;
        self.next_label += 1;
        kinds.map(|kind| Label::new(format!("{}_{}", kind, n)))
    }

    fn allocate(&mut self, name: &str, ty: &Type, span: Span) -> CompileResult<Address> {
        if self.next_address > u32::from(MAX_ADDRESS) {
            return Err(CompileError::codegen(
                format!(
                    "Out of data memory: at most {} variables",
                    u32::from(MAX_ADDRESS) + 1
                ),
                span,
            ));
        }
        let address = Address(self.next_address as u16);
        self.next_address += 1;
        self.out.destinations.push(Destination {
            address,
            name: name.to_string(),
            ty: ty.clone(),
            span,
        });
        Ok(address)
    }

    fn bind(&mut self, decl: NodeId, name: &str, ty: &Type, span: Span) -> CompileResult<Address> {
        let address = self.allocate(name, ty, span)?;
        self.slots.insert(decl, address);
        Ok(address)
    }

    fn slot_of(&self, expr: &Expr) -> CompileResult<(Address, SymbolClass)> {
        let var = self
            .info
            .var_of(expr)
            .ok_or_else(|| CompileError::codegen("Unresolved variable", expr.span()))?;
        let address = self
            .slots
            .get(&var.decl)
            .copied()
            .ok_or_else(|| CompileError::codegen(format!("No storage for '{}'", var.name), expr.span()))?;
        let class = match var.kind {
            _ if var.ty.is_const() => SymbolClass::Constant,
            VarKind::Param => SymbolClass::Parameter,
            VarKind::Global | VarKind::Local => SymbolClass::Variable,
        };
        Ok((address, class))
    }

    fn family(&self, expr: &Expr) -> CompileResult<Family> {
        self.info
            .family_of(expr)
            .ok_or_else(|| family_err(expr.span()))
    }

    pub fn generate(mut self, program: &Program) -> CompileResult<Lowered> {
        let globals: Vec<&VarDecl> = program
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Global(decl) => Some(decl),
                Item::Function(_) => None,
            })
            .collect();
        let functions: Vec<&FunctionDecl> = program
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Function(f) => Some(f),
                Item::Global(_) => None,
            })
            .collect();

        let mut global_slots = Vec::with_capacity(globals.len());
        for decl in &globals {
            let class = if decl.ty.is_const() {
                SymbolClass::Constant
            } else {
                SymbolClass::Variable
            };
            self.symbol(decl.name_span, class);
            let address = self.bind(decl.id, &decl.name, &decl.ty, decl.name_span)?;
            global_slots.push(address);
        }
        for f in &functions {
            let mut callees = BTreeSet::new();
            for stmt in &f.body.stmts {
                stmt_calls(stmt, &mut callees);
            }
            self.calls.insert(f.name.clone(), callees);
            let ret = if f.return_ty.is_void() {
                None
            } else {
                Some(self.allocate(&format!("{}.return", f.name), &f.return_ty, f.name_span)?)
            };
            let mut params = Vec::with_capacity(f.params.len());
            for param in &f.params {
                params.push(self.bind(param.id, &param.name, &param.ty, param.span)?);
            }
            self.frames.insert(f.name.clone(), Frame { params, ret });
        }

        for (decl, address) in globals.iter().zip(&global_slots) {
            self.out
                .lines
                .push(AsmLine::Read(*address, decl.name.clone()));
        }
        for (decl, address) in globals.iter().zip(&global_slots) {
            match &decl.init {
                Some(init) => {
                    self.lower_expr(init)?;
                    self.emit(Instruction::Pop(*address));
                }
                None => {
                    let zero = zero_of(&decl.ty);
                    self.emit(Instruction::Store(zero, *address));
                }
            }
        }
        self.emit(Instruction::Call(function_label("main")));
        self.emit(Instruction::Halt);

        for f in functions {
            self.lower_function(f)?;
        }
        Ok(self.out)
    }

    /// True when a call from `from` can lead back into `to`.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![from];
        while let Some(name) = pending.pop() {
            if name == to {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(callees) = self.calls.get(name) {
                pending.extend(callees.iter().map(String::as_str));
            }
        }
        false
    }

    fn lower_function(&mut self, f: &FunctionDecl) -> CompileResult<()> {
        self.current_fn = f.name.clone();
        self.symbol(f.name_span, SymbolClass::Function);
        for param in &f.params {
            self.symbol(param.span, SymbolClass::Parameter);
        }
        self.place(function_label(&f.name));
        let falls_through = self.lower_stmts(&f.body.stmts)?;
        if falls_through {
            self.emit(Instruction::Rtn);
        }
        Ok(())
    }

    /// Lower a statement list; returns false when control cannot reach its end.
    fn lower_stmts(&mut self, stmts: &[Stmt]) -> CompileResult<bool> {
        for (i, stmt) in stmts.iter().enumerate() {
            self.lower_stmt(stmt)?;
            if stmt.diverges() {
                if let Some(next) = stmts[i + 1..]
                    .iter()
                    .find(|s| !matches!(s, Stmt::Empty { .. }))
                {
                    self.warn("Unreachable statement", next.span());
                }
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::VarDecl(decl) => self.lower_local(decl),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let [else_label, end_label] = self.fresh_labels(["if_else", "if_end"]);
                let skip = if else_branch.is_some() {
                    else_label.clone()
                } else {
                    end_label.clone()
                };
                self.lower_condition(cond)?;
                self.emit(Instruction::Jz(skip));
                self.lower_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    if !then_branch.diverges() {
                        self.emit(Instruction::Jmp(end_label.clone()));
                    }
                    self.place(else_label);
                    self.lower_stmt(else_branch)?;
                }
                self.place(end_label);
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                let [head, end] = self.fresh_labels(["while_head", "while_end"]);
                self.place(head.clone());
                self.lower_condition(cond)?;
                self.emit(Instruction::Jz(end.clone()));
                self.lower_loop_body(body, end.clone(), head.clone())?;
                self.emit(Instruction::Jmp(head));
                self.place(end);
                Ok(())
            }
            Stmt::DoWhile { body, cond, .. } => {
                let [body_label, cond_label, end] =
                    self.fresh_labels(["do_body", "do_cond", "do_end"]);
                self.place(body_label.clone());
                self.lower_loop_body(body, end.clone(), cond_label.clone())?;
                self.place(cond_label);
                self.lower_condition(cond)?;
                self.emit(Instruction::Jnz(body_label));
                self.place(end);
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                let [head, step_label, end] =
                    self.fresh_labels(["for_head", "for_step", "for_end"]);
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                self.place(head.clone());
                if let Some(cond) = cond {
                    self.lower_condition(cond)?;
                    self.emit(Instruction::Jz(end.clone()));
                }
                self.lower_loop_body(body, end.clone(), step_label.clone())?;
                self.place(step_label);
                if let Some(step) = step {
                    self.lower_effect(step)?;
                }
                self.emit(Instruction::Jmp(head));
                self.place(end);
                Ok(())
            }
            Stmt::Break { span } => {
                let target = self
                    .loops
                    .last()
                    .map(|l| l.break_to.clone())
                    .ok_or_else(|| CompileError::codegen("'break' outside of a loop", *span))?;
                self.emit(Instruction::Jmp(target));
                Ok(())
            }
            Stmt::Continue { span } => {
                let target = self
                    .loops
                    .last()
                    .map(|l| l.continue_to.clone())
                    .ok_or_else(|| {
                        CompileError::codegen("'continue' outside of a loop", *span)
                    })?;
                self.emit(Instruction::Jmp(target));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.lower_expr(value)?;
                    let ret = self
                        .frames
                        .get(&self.current_fn)
                        .and_then(|frame| frame.ret)
                        .ok_or_else(|| {
                            CompileError::codegen("Return value from void function", value.span())
                        })?;
                    self.emit(Instruction::Pop(ret));
                }
                self.emit(Instruction::Rtn);
                Ok(())
            }
            Stmt::Expr { expr, .. } => self.lower_effect(expr),
            Stmt::Block(block) => {
                self.lower_stmts(&block.stmts)?;
                Ok(())
            }
            Stmt::Empty { .. } => Ok(()),
        }
    }

    fn lower_local(&mut self, decl: &VarDecl) -> CompileResult<()> {
        let class = if decl.ty.is_const() {
            SymbolClass::Constant
        } else {
            SymbolClass::Variable
        };
        self.symbol(decl.name_span, class);
        if !self.info.used.contains(&decl.id) {
            self.warn(
                format!("Variable '{}' is never read", decl.name),
                decl.name_span,
            );
        }
        // The initializer cannot see the variable it initializes.
        if let Some(init) = &decl.init {
            self.lower_expr(init)?;
        }
        let address = self.bind(decl.id, &decl.name, &decl.ty, decl.name_span)?;
        if decl.init.is_some() {
            self.emit(Instruction::Pop(address));
        }
        Ok(())
    }

    fn lower_loop_body(&mut self, body: &Stmt, break_to: Label, continue_to: Label) -> CompileResult<()> {
        self.loops.push(LoopLabels {
            break_to,
            continue_to,
        });
        let result = self.lower_stmt(body);
        self.loops.pop();
        result
    }

    /// Evaluate a condition into R.
    fn lower_condition(&mut self, cond: &Expr) -> CompileResult<()> {
        self.lower_expr(cond)?;
        self.emit(Instruction::GetPopR);
        Ok(())
    }

    /// Evaluate for side effects only; the stack is left as it was.
    fn lower_effect(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::Assign { .. } | Expr::Call { .. } => self.lower(expr, false),
            Expr::Unary { op, .. } if op.is_update() => self.lower(expr, false),
            _ => {
                self.lower(expr, true)?;
                if self.info.type_of(expr).is_some_and(|ty| !ty.is_void()) {
                    self.emit(Instruction::PopNop);
                }
                Ok(())
            }
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        self.lower(expr, true)
    }

    /// With `used`, push the expression's value; otherwise only its effects are kept.
    fn lower(&mut self, expr: &Expr, used: bool) -> CompileResult<()> {
        match expr {
            Expr::Literal { value, .. } => {
                let value = match *value {
                    Literal::Int(v) => Value::Int(v),
                    Literal::UInt(v) => Value::UInt(v),
                    Literal::Float(f) => Value::Float(f),
                };
                self.emit(Instruction::StorePush(value));
            }
            Expr::Ident { span, .. } => {
                let (address, class) = self.slot_of(expr)?;
                self.symbol(*span, class);
                self.emit(Instruction::Push(address));
            }
            Expr::Binary { span, op, lhs, rhs, .. } => {
                let family = self.family(lhs)?;
                let instr = select::binary(*op, family).ok_or_else(|| {
                    CompileError::codegen(
                        format!("Operator '{}' has no {} form", op.symbol(), family),
                        *span,
                    )
                })?;
                self.lower_expr(lhs)?;
                self.lower_expr(rhs)?;
                self.emit(Instruction::GetPopB);
                self.emit(Instruction::GetPopA);
                self.emit(instr);
                self.emit(Instruction::SavePush);
            }
            Expr::Unary {
                span, op, operand, ..
            } => {
                if op.is_update() {
                    return self.lower_update(expr, *op, *span, used);
                }
                let family = self.family(operand)?;
                match op {
                    UnOp::BitNot => {
                        let ones = match family {
                            Family::Unsigned => Value::UInt(u32::MAX),
                            _ => Value::Int(u32::MAX),
                        };
                        self.lower_expr(operand)?;
                        self.emit(Instruction::StorePush(ones));
                        self.emit(Instruction::GetPopB);
                        self.emit(Instruction::GetPopA);
                        self.emit(Instruction::Xor);
                    }
                    UnOp::Not => {
                        self.lower_expr(operand)?;
                        self.emit(Instruction::GetPopA);
                        self.emit(Instruction::Not);
                    }
                    _ => {
                        self.lower_expr(operand)?;
                        self.emit(Instruction::GetPopA);
                        self.emit(select::negate(family));
                    }
                }
                self.emit(Instruction::SavePush);
            }
            Expr::Assign {
                op,
                target_span,
                value,
                ..
            } => {
                let (address, class) = self.slot_of(expr)?;
                self.symbol(*target_span, class);
                match op {
                    None => {
                        self.lower_expr(value)?;
                        self.emit(Instruction::Pop(address));
                    }
                    Some(op) => {
                        let family = self.family(value)?;
                        let instr = select::binary(*op, family).ok_or_else(|| {
                            CompileError::codegen(
                                format!("Operator '{}=' has no {} form", op.symbol(), family),
                                *target_span,
                            )
                        })?;
                        self.emit(Instruction::Push(address));
                        self.lower_expr(value)?;
                        self.emit(Instruction::GetPopB);
                        self.emit(Instruction::GetPopA);
                        self.emit(instr);
                        self.emit(Instruction::Save(address));
                    }
                }
                if used {
                    self.emit(Instruction::Push(address));
                }
            }
            Expr::Call {
                span,
                callee,
                callee_span,
                args,
                ..
            } => {
                self.symbol(*callee_span, SymbolClass::Function);
                if self.reaches(callee, &self.current_fn) {
                    self.warn(
                        format!(
                            "Recursive call to '{}': parameters and locals are statically allocated",
                            callee
                        ),
                        *span,
                    );
                }
                for arg in args {
                    self.lower_expr(arg)?;
                }
                let (params, ret) = match self.frames.get(callee) {
                    Some(frame) => (frame.params.clone(), frame.ret),
                    None => {
                        return Err(CompileError::codegen(
                            format!("Unknown function: {}", callee),
                            *callee_span,
                        ))
                    }
                };
                for address in params.iter().rev() {
                    self.emit(Instruction::Pop(*address));
                }
                self.emit(Instruction::Call(function_label(callee)));
                if let (true, Some(ret)) = (used, ret) {
                    self.emit(Instruction::Push(ret));
                }
            }
            Expr::Intrinsic {
                intrinsic,
                name_span,
                args,
                ..
            } => {
                self.symbol(*name_span, SymbolClass::Intrinsic);
                self.lower_intrinsic(*intrinsic, args)?;
            }
            Expr::Cast { ty, expr: inner, .. } => {
                let from = self.family(inner)?;
                let to = ty.family().ok_or_else(|| family_err(expr.span()))?;
                self.lower_expr(inner)?;
                if let Some(convert) = select::convert(from, to) {
                    self.emit(Instruction::GetPopA);
                    self.emit(convert);
                    self.emit(Instruction::SavePush);
                }
            }
        }
        Ok(())
    }

    /// `++`/`--`: load into A, step, store R back.
    fn lower_update(&mut self, expr: &Expr, op: UnOp, span: Span, used: bool) -> CompileResult<()> {
        let (address, class) = self.slot_of(expr)?;
        if let Expr::Unary { operand, .. } = expr {
            self.symbol(operand.span(), class);
        }
        let family = self.info.family_of(expr).ok_or_else(|| family_err(span))?;
        let post = matches!(op, UnOp::PostInc | UnOp::PostDec);
        if used && post {
            self.emit(Instruction::Push(address));
        }
        self.emit(Instruction::GetA(address));
        self.emit(select::step(op, family));
        self.emit(Instruction::Save(address));
        if used && !post {
            self.emit(Instruction::Push(address));
        }
        Ok(())
    }

    fn lower_intrinsic(&mut self, intrinsic: Intrinsic, args: &[Expr]) -> CompileResult<()> {
        for arg in args {
            self.lower_expr(arg)?;
        }
        match intrinsic {
            Intrinsic::SetLed => {
                self.emit(Instruction::GetPopA);
                self.emit(Instruction::SetLed);
            }
            Intrinsic::LoadA => self.emit(Instruction::GetPopA),
            Intrinsic::LoadB => self.emit(Instruction::GetPopB),
            Intrinsic::Push => self.emit(Instruction::MovOutPush),
            Intrinsic::PopInt | Intrinsic::PopUInt | Intrinsic::PopFloat => {
                self.emit(Instruction::MovInPop)
            }
            Intrinsic::Tick => {
                self.emit(Instruction::Tick);
                self.emit(Instruction::SavePush);
            }
            Intrinsic::URand => {
                self.emit(Instruction::Rand);
                self.emit(Instruction::SavePush);
            }
        }
        Ok(())
    }
}

fn zero_of(ty: &Type) -> Value {
    match ty.family() {
        Some(Family::Unsigned) => Value::UInt(0),
        Some(Family::Float) => Value::Float(0.0),
        _ => Value::Int(0),
    }
}

/// Generate assembly lines for a checked program.
pub fn generate(program: &Program, info: &TypeInfo) -> CompileResult<Lowered> {
    CodeGenerator::new(info).generate(program)
}
