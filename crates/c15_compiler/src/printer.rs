//! Render assembly lines as text, the format the assembler reads back.

use c15_syntax::ir::AsmLine;
use std::fmt::Write;

pub fn render_line(line: &AsmLine) -> String {
    match line {
        AsmLine::Label(label) => format!("{}:", label),
        AsmLine::Instr(instr) => format!("    {}", instr),
        AsmLine::Data(value) => format!("    .data {}", value),
        AsmLine::Read(address, name) => format!(".read {} {}", address, name),
        AsmLine::Comment(text) => format!("# {}", text),
    }
}

/// One line per label, directive or instruction, in program order.
pub fn print(lines: &[AsmLine]) -> String {
    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "{}", render_line(line));
    }
    out
}
