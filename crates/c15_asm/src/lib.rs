//! Two-pass assembler for the C15 CPU.
//!
//! Pass 1 ([`scan`]) turns each line into operations and records label
//! positions; pass 2 ([`resolve`]) resolves operands and packs words. All
//! state lives in a per-call [`Session`], so independent programs can be
//! assembled concurrently.

pub mod artifact;
pub mod opcodes;
pub mod resolve;
pub mod scan;
pub mod value;

pub use artifact::{Artifact, ReadRegion};
pub use scan::Session;

use c15_syntax::diagnostics::{has_errors, Diagnostic};
use tracing::debug;

/// Total words (code + data) the CPU can hold.
pub const DEFAULT_MEMORY_LIMIT: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssemblerOptions {
    pub memory_limit: u32,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceUsage {
    /// Words of code and literals.
    pub stack: u32,
    /// One past the highest data address referenced.
    pub memory: u32,
    pub limit: u32,
}

impl ResourceUsage {
    pub fn total(&self) -> u32 {
        self.stack + self.memory
    }

    pub fn fits(&self) -> bool {
        self.total() <= self.limit
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assembled {
    pub artifact: Artifact,
    pub usage: ResourceUsage,
    pub warnings: Vec<Diagnostic>,
}

/// Assemble with the default memory limit.
pub fn assemble(text: &str) -> Result<Assembled, Vec<Diagnostic>> {
    assemble_with(text, &AssemblerOptions::default())
}

/// Assemble text into an artifact. Any error discards the whole artifact;
/// the returned diagnostics then include warnings too. A program over the
/// memory limit is rejected before its operands are resolved.
pub fn assemble_with(text: &str, options: &AssemblerOptions) -> Result<Assembled, Vec<Diagnostic>> {
    let session = Session::scan(text);
    debug!(
        words = session.stack_size(),
        labels = session.labels.len(),
        "scan finished"
    );
    let mut diagnostics = session.diagnostics.clone();

    let usage = ResourceUsage {
        stack: session.stack_size(),
        memory: session.memory_size,
        limit: options.memory_limit,
    };
    debug!("resources used: {} / {}", usage.total(), usage.limit);
    if !usage.fits() {
        diagnostics.push(Diagnostic::error(
            format!("Not enough space, ({},{}).", usage.memory, usage.stack),
            None,
        ));
        return Err(diagnostics);
    }

    match resolve::resolve(&session) {
        Ok(artifact) if !has_errors(&diagnostics) => Ok(Assembled {
            artifact,
            usage,
            warnings: diagnostics,
        }),
        Ok(_) => Err(diagnostics),
        Err(errors) => {
            diagnostics.extend(errors);
            Err(diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::encode;

    #[test]
    fn store_add_halt() {
        let assembled = assemble("STORE 5 a0\nADD\nHALT").unwrap();
        // STORE opcode word (a0 = 4 after four words of code), its value word, ADD, HALT.
        assert_eq!(
            assembled.artifact.stack,
            vec![encode(0x02, 4, 0), 5, 0x05, 0x00]
        );
        assert_eq!(assembled.artifact.regions, vec![4]);
        assert_eq!(
            assembled.usage,
            ResourceUsage {
                stack: 4,
                memory: 1,
                limit: 500
            }
        );
    }

    #[test]
    fn label_at_start_resolves_to_zero() {
        let assembled = assemble("fib:\nJMP fib").unwrap();
        assert_eq!(assembled.artifact.stack, vec![0x00000A]);
    }

    #[test]
    fn oversized_address_is_fatal() {
        let diagnostics = assemble("PUSH a4096").unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Addresses are limited to 12 bits");
    }

    #[test]
    fn budget_overflow_discards_everything() {
        let text = "NOP\n".repeat(10) + "PUSH a495";
        let diagnostics = assemble(&text).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Not enough space, (496,11).");
        assert!(diagnostics[0].location.is_none());
    }

    #[test]
    fn budget_overflow_is_the_only_diagnostic() {
        for text in ["PUSH a4095", "JMP nowhere\nPUSH a499"] {
            let diagnostics = assemble(text).unwrap_err();
            assert_eq!(diagnostics.len(), 1, "{}: {:?}", text, diagnostics);
            assert!(diagnostics[0].message.starts_with("Not enough space"));
        }
    }

    #[test]
    fn budget_comes_from_options() {
        let options = AssemblerOptions { memory_limit: 3 };
        assert!(assemble_with("NOP\nNOP\nPUSH a0", &options).is_err());
        assert!(assemble_with("NOP\nPUSH a0", &options).is_ok());
    }

    #[test]
    fn warnings_do_not_block_assembly() {
        let assembled = assemble("x:\nx:\nHALT 1").unwrap();
        assert_eq!(assembled.warnings.len(), 2);
        assert_eq!(assembled.artifact.stack, vec![0]);
    }

    #[test]
    fn scan_errors_suppress_the_artifact() {
        let diagnostics = assemble("HALT\nWHAT\nJMP missing").unwrap_err();
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Unknown opcode 'WHAT'.", "The label 'missing' was not found."]
        );
    }
}
