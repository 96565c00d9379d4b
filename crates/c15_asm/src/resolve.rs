//! Pass 2: resolve operands against the finished label table and pack each
//! operation into a word.

use crate::artifact::{Artifact, ReadRegion};
use crate::scan::{Operand, Session, Word};
use c15_syntax::diagnostics::{at, Diagnostic};
use c15_syntax::ir::MAX_ADDRESS;
use c15_syntax::span::{FileId, Span};
use std::collections::BTreeSet;

/// `arg1 ‖ arg0 ‖ opcode` as 12, 12 and 8 bit fields.
pub fn encode(opcode: u16, arg0: u32, arg1: u32) -> u32 {
    (arg1 << 20) | (arg0 << 8) | u32::from(opcode)
}

struct Resolver<'s> {
    session: &'s Session,
    regions: BTreeSet<u32>,
    errors: Vec<Diagnostic>,
}

impl<'s> Resolver<'s> {
    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors
            .push(Diagnostic::error(message, at(FileId::ASSEMBLY, span)));
    }

    /// Absolute value of an operand; `track` adds data addresses to the region set.
    fn operand(&mut self, operand: &Operand, span: Span, track: bool) -> Option<u32> {
        match operand {
            Operand::Immediate(value) => Some(u32::from(*value)),
            Operand::Label(name) => match self.session.labels.get(name) {
                Some(&position) => Some(position),
                None => {
                    self.error(format!("The label '{}' was not found.", name), span);
                    None
                }
            },
            Operand::Data(offset) => {
                let address = self.session.stack_size() + u32::from(*offset);
                if address > u32::from(MAX_ADDRESS) {
                    self.error("Addresses are limited to 12 bits", span);
                    return None;
                }
                if track {
                    self.regions.insert(address);
                }
                Some(address)
            }
        }
    }
}

/// Encode every word. Fails with one diagnostic per unresolvable operand.
pub fn resolve(session: &Session) -> Result<Artifact, Vec<Diagnostic>> {
    let mut resolver = Resolver {
        session,
        regions: BTreeSet::new(),
        errors: Vec::new(),
    };

    let mut stack = Vec::with_capacity(session.words.len());
    for word in &session.words {
        match word {
            Word::Raw(value) => stack.push(*value),
            Word::Op(op) => {
                let mut fields = [0u32; 2];
                let mut ok = true;
                for (field, arg) in fields.iter_mut().zip(&op.args) {
                    match resolver.operand(arg, op.span, true) {
                        Some(value) => *field = value,
                        None => ok = false,
                    }
                }
                if ok {
                    stack.push(encode(op.opcode, fields[0], fields[1]));
                }
            }
        }
    }

    let mut read_regions = Vec::with_capacity(session.reads.len());
    for read in &session.reads {
        if let Some(address) = resolver.operand(&read.target, read.span, false) {
            read_regions.push(ReadRegion {
                address,
                name: read.name.clone(),
            });
        }
    }

    if !resolver.errors.is_empty() {
        return Err(resolver.errors);
    }
    Ok(Artifact {
        stack,
        regions: resolver.regions.into_iter().collect(),
        read_regions,
    })
}
