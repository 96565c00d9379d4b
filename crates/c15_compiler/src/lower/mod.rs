//! Lower the checked AST to assembly lines. `select` maps operator + family to
//! an opcode; `codegen` walks the tree.

mod codegen;
mod select;

pub use codegen::{generate, CodeGenerator, Lowered};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use crate::typecheck::check;
    use c15_syntax::diagnostics::Level;
    use c15_syntax::ir::{Address, AsmLine, Instruction, Label, Value};
    use c15_syntax::symbols::SymbolClass;

    fn lower_src(src: &str) -> Lowered {
        let program = parse(tokenize(src).unwrap()).unwrap();
        let info = check(&program).unwrap();
        generate(&program, &info).unwrap()
    }

    fn instrs(lowered: &Lowered) -> Vec<Instruction> {
        lowered
            .lines
            .iter()
            .filter_map(|line| match line {
                AsmLine::Instr(i) => Some(i.clone()),
                _ => None,
            })
            .collect()
    }

    fn labels(lowered: &Lowered) -> Vec<String> {
        lowered
            .lines
            .iter()
            .filter_map(|line| match line {
                AsmLine::Label(l) => Some(l.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn entry_calls_main_then_halts() {
        let lowered = lower_src("void main() { }");
        assert_eq!(
            instrs(&lowered),
            vec![
                Instruction::Call(Label::new("fn_main")),
                Instruction::Halt,
                Instruction::Rtn,
            ]
        );
        assert_eq!(labels(&lowered), vec!["fn_main"]);
    }

    #[test]
    fn binary_ops_use_the_register_protocol() {
        let lowered = lower_src("void main() { int a = 1; int b = a - 2; _push(b); }");
        let body = instrs(&lowered);
        let a = Address(0);
        let b = Address(1);
        assert_eq!(
            &body[2..],
            &[
                Instruction::StorePush(Value::Int(1)),
                Instruction::Pop(a),
                Instruction::Push(a),
                Instruction::StorePush(Value::Int(2)),
                Instruction::GetPopB,
                Instruction::GetPopA,
                Instruction::SSub,
                Instruction::SavePush,
                Instruction::Pop(b),
                Instruction::Push(b),
                Instruction::MovOutPush,
                Instruction::Rtn,
            ]
        );
    }

    #[test]
    fn family_drives_selection() {
        let src = "void main() { uint u = 1u; float f = 1.0; _push(u * u); _push(f * f); }";
        let body = instrs(&lower_src(src));
        assert!(body.contains(&Instruction::Mult));
        assert!(body.contains(&Instruction::FMult));
        assert!(!body.contains(&Instruction::SMult));
    }

    #[test]
    fn globals_are_initialized_and_exposed() {
        let lowered = lower_src("int counter; const float K = 2.5; void main() { counter++; }");
        assert_eq!(lowered.lines[0], AsmLine::Read(Address(0), "counter".into()));
        assert_eq!(lowered.lines[1], AsmLine::Read(Address(1), "K".into()));
        let body = instrs(&lowered);
        assert_eq!(body[0], Instruction::Store(Value::Int(0), Address(0)));
        assert_eq!(body[1], Instruction::StorePush(Value::Float(2.5)));
        assert_eq!(body[2], Instruction::Pop(Address(1)));
        assert_eq!(
            &body[5..8],
            &[
                Instruction::GetA(Address(0)),
                Instruction::SInc,
                Instruction::Save(Address(0)),
            ]
        );
    }

    #[test]
    fn while_loop_labels_and_branches() {
        let src = "void main() { int i = 0; while (i < 3) { if (i == 1) break; i++; } }";
        let lowered = lower_src(src);
        assert_eq!(
            labels(&lowered),
            vec!["fn_main", "while_head_0", "if_end_1", "while_end_0"]
        );
        let body = instrs(&lowered);
        assert!(body.contains(&Instruction::Jz(Label::new("while_end_0"))));
        assert!(body.contains(&Instruction::Jmp(Label::new("while_head_0"))));
        assert!(body.contains(&Instruction::Jz(Label::new("if_end_1"))));
        assert_eq!(
            body.iter()
                .filter(|i| **i == Instruction::Jmp(Label::new("while_end_0")))
                .count(),
            1
        );
    }

    #[test]
    fn do_while_branches_back_on_nonzero() {
        let lowered = lower_src("void main() { int i = 0; do { i++; } while (i < 5); }");
        assert_eq!(
            labels(&lowered),
            vec!["fn_main", "do_body_0", "do_cond_0", "do_end_0"]
        );
        assert!(instrs(&lowered).contains(&Instruction::Jnz(Label::new("do_body_0"))));
    }

    #[test]
    fn for_continue_jumps_to_step() {
        let src = "void main() { for (int i = 0; i < 4; i++) { if (i == 2) continue; _push(i); } }";
        let body = instrs(&lower_src(src));
        assert!(body.contains(&Instruction::Jmp(Label::new("for_step_0"))));
        assert!(body.contains(&Instruction::Jz(Label::new("for_end_0"))));
    }

    #[test]
    fn calls_pass_arguments_through_static_slots() {
        let src = "int add(int a, int b) { return a + b; } void main() { _push(add(1, 2)); }";
        let lowered = lower_src(src);
        // add.return = a0, a = a1, b = a2
        let body = instrs(&lowered);
        let call = body
            .iter()
            .position(|i| *i == Instruction::Call(Label::new("fn_add")))
            .unwrap();
        assert_eq!(
            &body[call - 2..=call + 1],
            &[
                Instruction::Pop(Address(2)),
                Instruction::Pop(Address(1)),
                Instruction::Call(Label::new("fn_add")),
                Instruction::Push(Address(0)),
            ]
        );
        assert!(body.contains(&Instruction::Pop(Address(0))));
        assert_eq!(lowered.destinations[0].name, "add.return");
    }

    #[test]
    fn unused_expression_values_are_dropped() {
        let body = instrs(&lower_src("void main() { 1 + 2; _pop_int(); }"));
        assert_eq!(
            body.iter().filter(|i| **i == Instruction::PopNop).count(),
            2
        );
    }

    #[test]
    fn casts_convert_only_across_float() {
        let body = instrs(&lower_src(
            "void main() { int i = 3; uint u = (uint) i; float f = (float) u; _push(f); }",
        ));
        assert_eq!(body.iter().filter(|i| **i == Instruction::IntToFl).count(), 1);
        assert!(!body.contains(&Instruction::FlToInt));
    }

    #[test]
    fn bitwise_not_is_xor_with_all_ones() {
        let body = instrs(&lower_src("void main() { uint x = 5u; _push(~x); }"));
        assert!(body.contains(&Instruction::StorePush(Value::UInt(u32::MAX))));
        assert!(body.contains(&Instruction::Xor));
    }

    #[test]
    fn warnings_for_unused_unreachable_and_recursion() {
        let src = r#"
int fact(int n) { if (n <= 1) return 1; return n * fact(n - 1); }
void main() {
    int unused = 1;
    _push(fact(4));
    return;
    _push(1);
}
"#;
        let lowered = lower_src(src);
        let messages: Vec<&str> = lowered.warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.starts_with("Recursive call to 'fact'")));
        assert!(messages.contains(&"Variable 'unused' is never read"));
        assert!(messages.contains(&"Unreachable statement"));
        assert!(lowered.warnings.iter().all(|w| w.level == Level::Warning));
    }

    #[test]
    fn symbols_cover_declarations_and_references() {
        let src = "const int K = 1; int f(int p) { return p + K; } void main() { _setled(f(2)); }";
        let lowered = lower_src(src);
        let classes: Vec<SymbolClass> = lowered.symbols.iter().map(|s| s.class).collect();
        assert!(classes.contains(&SymbolClass::Constant));
        assert!(classes.contains(&SymbolClass::Parameter));
        assert!(classes.contains(&SymbolClass::Function));
        assert!(classes.contains(&SymbolClass::Intrinsic));
    }

    #[test]
    fn every_variable_gets_its_own_address() {
        let src = "void main() { { int a = 1; _push(a); } { int b = 2; _push(b); } }";
        let lowered = lower_src(src);
        let mut addresses: Vec<u16> = lowered.destinations.iter().map(|d| d.address.0).collect();
        addresses.dedup();
        assert_eq!(addresses, vec![0, 1]);
    }

    #[test]
    fn mutual_recursion_is_warned_about() {
        let src = "void ping(int n) { if (n) pong(n - 1); } void pong(int n) { ping(n); } void leaf() { } void main() { ping(3); leaf(); }";
        let lowered = lower_src(src);
        let messages: Vec<&str> = lowered.warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.starts_with("Recursive call to 'pong'")));
        assert!(messages.iter().any(|m| m.starts_with("Recursive call to 'ping'")));
        assert!(!messages.iter().any(|m| m.contains("'leaf'")));
        assert_eq!(messages.iter().filter(|m| m.starts_with("Recursive")).count(), 2);
    }

    #[test]
    fn nested_divergence_makes_code_unreachable() {
        let src = "void main() { int x = 0; { return; } x = 2; _push(x); }";
        let lowered = lower_src(src);
        assert_eq!(lowered.warnings.len(), 1);
        assert_eq!(lowered.warnings[0].message, "Unreachable statement");

        let src = "int pick(int c) { if (c) { return 1; } else return 2; _push(c); } void main() { _push(pick(1)); }";
        let lowered = lower_src(src);
        let messages: Vec<&str> = lowered.warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages, vec!["Unreachable statement"]);
        // Two returns in `pick`, one fall-through return in `main`.
        let returns = instrs(&lowered)
            .iter()
            .filter(|i| matches!(i, Instruction::Rtn))
            .count();
        assert_eq!(returns, 3);
    }

    #[test]
    fn counter_that_is_only_bumped_is_never_read() {
        let lowered = lower_src("void main() { int ticks = 0; ticks++; }");
        let messages: Vec<&str> = lowered.warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages, vec!["Variable 'ticks' is never read"]);
    }
}
