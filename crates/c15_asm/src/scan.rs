//! Pass 1: split assembly text into operations, record label positions and
//! track how much data memory the program touches.

use crate::opcodes::{self, Shape};
use crate::value::parse_value;
use c15_syntax::diagnostics::{at, Diagnostic};
use c15_syntax::ir::MAX_ADDRESS;
use c15_syntax::span::{FileId, Span};
use std::collections::HashMap;

/// Operand slot after scanning; numbers are not yet resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// `a<N>`: data address relative to the end of the code region.
    Data(u16),
    Label(String),
    /// Literal taken as-is (slot operands only).
    Immediate(u16),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub span: Span,
    pub opcode: u16,
    pub args: Vec<Operand>,
}

/// One emitted word: an instruction to encode or a raw literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Word {
    Op(Operation),
    Raw(u32),
}

/// `.read` directive awaiting resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRead {
    pub span: Span,
    pub target: Operand,
    pub name: String,
}

/// State of one assembly run. Nothing outlives the call that created it.
#[derive(Debug, Default)]
pub struct Session {
    pub words: Vec<Word>,
    pub labels: HashMap<String, u32>,
    pub reads: Vec<PendingRead>,
    /// One past the highest data address referenced.
    pub memory_size: u32,
    pub diagnostics: Vec<Diagnostic>,
}

fn is_label_name(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Digits of an `a<N>` operand.
fn address_digits(text: &str) -> Option<&str> {
    let digits = text.strip_prefix('a')?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words emitted so far; also the position the next label binds to.
    pub fn stack_size(&self) -> u32 {
        self.words.len() as u32
    }

    /// Scan a whole program.
    pub fn scan(text: &str) -> Self {
        let mut session = Self::new();
        let mut offset = 0u32;
        for raw in text.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let span = Span::new(offset, offset + line.len() as u32);
            offset += raw.len() as u32 + 1;
            session.scan_line(line, span);
        }
        session
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(message, at(FileId::ASSEMBLY, span)));
    }

    fn warn(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::warning(message, at(FileId::ASSEMBLY, span)));
    }

    pub fn scan_line(&mut self, line: &str, span: Span) {
        let code = match line.find('#') {
            Some(i) => &line[..i],
            None => line,
        };
        let tokens: Vec<&str> = code.split_whitespace().collect();
        let Some((&head, args)) = tokens.split_first() else {
            return;
        };

        if let Some((name, rest)) = head.split_once(':') {
            if is_label_name(name) {
                self.define_label(name, span);
                if !rest.is_empty() || !args.is_empty() {
                    self.warn(format!("Text after label '{}' is ignored.", name), span);
                }
                return;
            }
        }

        match head {
            ".data" => self.scan_data(args, span),
            ".read" => self.scan_read(args, span),
            mnemonic => self.scan_instruction(mnemonic, args, span),
        }
    }

    fn define_label(&mut self, name: &str, span: Span) {
        let position = self.stack_size();
        if self.labels.insert(name.to_string(), position).is_some() {
            self.warn(
                format!(
                    "Label '{}' is defined more than once; the last definition is used.",
                    name
                ),
                span,
            );
        }
    }

    fn scan_data(&mut self, args: &[&str], span: Span) {
        let [text] = args else {
            self.error("Expected one argument.", span);
            return;
        };
        match parse_value(text) {
            Ok(value) => self.words.push(Word::Raw(value)),
            Err(e) => self.error(e.to_string(), span),
        }
    }

    fn scan_read(&mut self, args: &[&str], span: Span) {
        let [target, name] = args else {
            self.error("Expected two arguments.", span);
            return;
        };
        if let Some(target) = self.parse_slot(target, span) {
            self.reads.push(PendingRead {
                span,
                target,
                name: name.to_string(),
            });
        }
    }

    fn scan_instruction(&mut self, mnemonic: &str, args: &[&str], span: Span) {
        let Some(info) = opcodes::lookup(mnemonic) else {
            self.error(format!("Unknown opcode '{}'.", mnemonic), span);
            return;
        };
        let opcode = info.opcode;
        match (info.shape, args) {
            (Shape::Bare, []) => self.push_op(opcode, Vec::new(), span),
            (Shape::Bare, _) => {
                self.warn(
                    format!("'{}' takes no arguments; extra text ignored.", mnemonic),
                    span,
                );
                self.push_op(opcode, Vec::new(), span);
            }
            (Shape::Target, [target]) => {
                if let Some(target) = self.parse_target(target, span) {
                    self.push_op(opcode, vec![target], span);
                }
            }
            (Shape::Target, _) => self.error("Expected a single argument.", span),
            (Shape::TwoTargets, [src, dst]) => {
                let src = self.parse_target(src, span);
                let dst = self.parse_target(dst, span);
                if let (Some(src), Some(dst)) = (src, dst) {
                    self.push_op(opcode, vec![src, dst], span);
                }
            }
            (Shape::Value, [value]) => match parse_value(value) {
                Ok(value) => {
                    self.push_op(opcode, Vec::new(), span);
                    self.words.push(Word::Raw(value));
                }
                Err(e) => self.error(e.to_string(), span),
            },
            (Shape::ValueTarget, [value, target]) => {
                let value = match parse_value(value) {
                    Ok(value) => value,
                    Err(e) => {
                        self.error(e.to_string(), span);
                        return;
                    }
                };
                if let Some(target) = self.parse_target(target, span) {
                    self.push_op(opcode, vec![target], span);
                    self.words.push(Word::Raw(value));
                }
            }
            (Shape::Slot, [slot]) => {
                if let Some(slot) = self.parse_slot(slot, span) {
                    self.push_op(opcode, vec![slot], span);
                }
            }
            (Shape::TwoSlots, [x, y]) => {
                let x = self.parse_slot(x, span);
                let y = self.parse_slot(y, span);
                if let (Some(x), Some(y)) = (x, y) {
                    self.push_op(opcode, vec![x, y], span);
                }
            }
            (Shape::Value | Shape::Slot, _) => self.error("Expected one argument.", span),
            (Shape::TwoTargets | Shape::ValueTarget | Shape::TwoSlots, _) => {
                self.error("Expected two arguments.", span)
            }
        }
    }

    fn push_op(&mut self, opcode: u16, args: Vec<Operand>, span: Span) {
        self.words.push(Word::Op(Operation { span, opcode, args }));
    }

    /// Data address or label.
    fn parse_target(&mut self, text: &str, span: Span) -> Option<Operand> {
        if let Some(digits) = address_digits(text) {
            let address = digits.parse::<u32>().ok().filter(|&a| a <= u32::from(MAX_ADDRESS));
            let Some(address) = address else {
                self.error("Addresses are limited to 12 bits", span);
                return None;
            };
            self.memory_size = self.memory_size.max(address + 1);
            return Some(Operand::Data(address as u16));
        }
        if is_label_name(text) {
            return Some(Operand::Label(text.to_string()));
        }
        self.error("Expected address.", span);
        None
    }

    /// Data address, label or 12-bit immediate.
    fn parse_slot(&mut self, text: &str, span: Span) -> Option<Operand> {
        if address_digits(text).is_some() || is_label_name(text) {
            return self.parse_target(text, span);
        }
        match parse_value(text) {
            Ok(value) if value <= u32::from(MAX_ADDRESS) => Some(Operand::Immediate(value as u16)),
            Ok(_) => {
                self.error(
                    format!("The value {} must be within 0 and {}.", text, MAX_ADDRESS),
                    span,
                );
                None
            }
            Err(e) => {
                self.error(e.to_string(), span);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c15_syntax::diagnostics::has_errors;

    fn messages(session: &Session) -> Vec<&str> {
        session
            .diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect()
    }

    #[test]
    fn labels_bind_to_the_word_count() {
        let session = Session::scan("start:\n  STORE 5 a0\n# comment\n\nloop: \nJMP loop\n");
        assert_eq!(session.labels["start"], 0);
        assert_eq!(session.labels["loop"], 2);
        assert_eq!(session.stack_size(), 3);
        assert!(session.diagnostics.is_empty());
    }

    #[test]
    fn store_emits_opcode_then_value() {
        let session = Session::scan("STORE 0x10 a3");
        assert_eq!(session.words.len(), 2);
        assert!(matches!(
            &session.words[0],
            Word::Op(Operation { opcode: 0x02, args, .. }) if args == &[Operand::Data(3)]
        ));
        assert_eq!(session.words[1], Word::Raw(0x10));
        assert_eq!(session.memory_size, 4);
    }

    #[test]
    fn slots_accept_immediates_addresses_and_labels() {
        let session = Session::scan("QADD a1 7\nVPUSH here\nQSTORE 4095 a0");
        let Word::Op(op) = &session.words[0] else {
            panic!("expected operation")
        };
        assert_eq!(op.args, vec![Operand::Data(1), Operand::Immediate(7)]);
        let Word::Op(op) = &session.words[1] else {
            panic!("expected operation")
        };
        assert_eq!(op.args, vec![Operand::Label("here".into())]);
        assert!(!has_errors(&session.diagnostics));
    }

    #[test]
    fn reports_line_errors_and_keeps_scanning() {
        let text = "FOO\nPUSH a4096\nPUSH\nVPUSH 4096\nSTORE 1\n.data 0x1FFFFFFFF\nMOV a1 ?\nHALT";
        let session = Session::scan(text);
        assert_eq!(
            messages(&session),
            vec![
                "Unknown opcode 'FOO'.",
                "Addresses are limited to 12 bits",
                "Expected a single argument.",
                "The value 4096 must be within 0 and 4095.",
                "Expected two arguments.",
                "Values are limited to 32 bits.",
                "Expected address.",
            ]
        );
        assert_eq!(session.stack_size(), 1);
    }

    #[test]
    fn diagnostics_carry_the_line_span() {
        let session = Session::scan("HALT\n  BOGUS\n");
        assert_eq!(session.diagnostics[0].span(), Some(Span::new(5, 12)));
    }

    #[test]
    fn duplicate_labels_warn_and_last_wins() {
        let session = Session::scan("x:\nNOP\nx:\nNOP");
        assert_eq!(session.labels["x"], 1);
        assert!(!has_errors(&session.diagnostics));
        assert_eq!(session.diagnostics.len(), 1);
    }

    #[test]
    fn trailing_comments_are_ignored() {
        let session = Session::scan("PUSH a2 # keep\n.read a2 counter");
        assert!(session.diagnostics.is_empty());
        assert_eq!(session.reads[0].name, "counter");
        assert_eq!(session.reads[0].target, Operand::Data(2));
    }
}
