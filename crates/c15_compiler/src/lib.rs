//! C15 compiler: lexer, parser, type checker, code generator, printer, pipeline.

pub mod error;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod printer;
pub mod typecheck;

pub use error::{CompileError, CompileResult, ErrorKind};

use c15_asm::{Assembled, AssemblerOptions};
use c15_syntax::diagnostics::{format_diagnostic, Diagnostic};
use c15_syntax::ir::{AsmLine, Destination};
use c15_syntax::span::FileId;
use c15_syntax::symbols::Symbol;
use std::path::Path;
use tracing::debug;

/// Successful compile: assembly text plus the editor side outputs.
#[derive(Clone, Debug)]
pub struct Compilation {
    pub assembly: String,
    pub lines: Vec<AsmLine>,
    pub destinations: Vec<Destination>,
    pub symbols: Vec<Symbol>,
    pub warnings: Vec<Diagnostic>,
}

/// Compile source text to assembly text. Stops at the first error.
pub fn compile(source: &str) -> CompileResult<Compilation> {
    let tokens = lexer::tokenize(source)?;
    debug!(tokens = tokens.len(), "lexed");
    let program = parser::parse(tokens)?;
    debug!(items = program.items.len(), "parsed");
    let info = typecheck::check(&program)?;
    let lowered = lower::generate(&program, &info)?;
    debug!(
        lines = lowered.lines.len(),
        destinations = lowered.destinations.len(),
        warnings = lowered.warnings.len(),
        "generated"
    );
    let assembly = printer::print(&lowered.lines);
    Ok(Compilation {
        assembly,
        lines: lowered.lines,
        destinations: lowered.destinations,
        symbols: lowered.symbols,
        warnings: lowered.warnings,
    })
}

/// Compile and assemble.
#[derive(Clone, Debug)]
pub struct Build {
    pub compilation: Compilation,
    pub assembled: Assembled,
}

impl Build {
    /// Compiler warnings followed by assembler warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.compilation
            .warnings
            .iter()
            .chain(&self.assembled.warnings)
    }
}

/// Why a build produced nothing. `assembly` is set when compiling succeeded
/// and the assembler rejected its output; diagnostics located in
/// [`FileId::ASSEMBLY`] point into it.
#[derive(Clone, Debug)]
pub struct BuildFailure {
    pub diagnostics: Vec<Diagnostic>,
    pub assembly: Option<String>,
}

pub fn build_source(source: &str, options: &AssemblerOptions) -> Result<Build, BuildFailure> {
    let compilation = compile(source).map_err(|e| BuildFailure {
        diagnostics: vec![e.into()],
        assembly: None,
    })?;
    match c15_asm::assemble_with(&compilation.assembly, options) {
        Ok(assembled) => {
            debug!(
                used = assembled.usage.total(),
                limit = assembled.usage.limit,
                "assembled"
            );
            Ok(Build {
                compilation,
                assembled,
            })
        }
        Err(mut diagnostics) => {
            let mut all = compilation.warnings.clone();
            all.append(&mut diagnostics);
            Err(BuildFailure {
                diagnostics: all,
                assembly: Some(compilation.assembly),
            })
        }
    }
}

fn read_source(path: &Path) -> Result<String, Diagnostic> {
    std::fs::read_to_string(path).map_err(|e| {
        Diagnostic::error(
            format!("failed to read {}: {}", path.display(), e),
            None,
        )
    })
}

/// Compile a source file. Returns either the compilation or its diagnostics.
pub fn compile_file(path: &Path) -> Result<Compilation, Vec<Diagnostic>> {
    let source = read_source(path).map_err(|d| vec![d])?;
    compile(&source).map_err(|e| vec![e.into()])
}

/// Compile and assemble a source file.
pub fn build_file(path: &Path, options: &AssemblerOptions) -> Result<Build, BuildFailure> {
    let source = read_source(path).map_err(|d| BuildFailure {
        diagnostics: vec![d],
        assembly: None,
    })?;
    build_source(&source, options)
}

/// Render diagnostics with the line they point at. Assembly-located
/// diagnostics are shown against `assembly` when it is available.
pub fn render_diagnostics(
    file_name: &str,
    source: &str,
    assembly: Option<&str>,
    diags: &[Diagnostic],
) -> Vec<String> {
    let asm_name = format!("{} (assembly)", file_name);
    diags
        .iter()
        .map(|d| match (d.location.map(|l| l.file), assembly) {
            (Some(FileId::ASSEMBLY), Some(asm)) => format_diagnostic(asm, &asm_name, d),
            _ => format_diagnostic(source, file_name, d),
        })
        .collect()
}

/// Print diagnostics to stderr with source context.
pub fn print_diagnostics(
    file_name: &str,
    source: &str,
    assembly: Option<&str>,
    diags: &[Diagnostic],
) {
    for line in render_diagnostics(file_name, source, assembly, diags) {
        eprintln!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c15_syntax::diagnostics::Level;
    use c15_syntax::span::Span;

    #[test]
    fn compile_reports_first_error_with_span() {
        let err = compile("void main() {\n  int x = 1 @ 2;\n}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert_eq!(err.span, Span::new(26, 27));
        let rendered = render_diagnostics("bad.c15s", "void main() {\n  int x = 1 @ 2;\n}", None, &[err.into()]);
        assert!(rendered[0].starts_with("bad.c15s:2:13: error: Unexpected character '@'"));
    }

    #[test]
    fn build_produces_an_artifact() {
        let src = "int counter; void main() { counter = 3; counter++; }";
        let build = build_source(src, &AssemblerOptions::default()).unwrap();
        let artifact = &build.assembled.artifact;
        assert_eq!(artifact.read_regions.len(), 1);
        assert_eq!(artifact.read_regions[0].name, "counter");
        assert_eq!(
            artifact.regions,
            vec![artifact.stack.len() as u32],
            "counter lives right after the code"
        );
    }

    #[test]
    fn budget_failure_keeps_the_assembly() {
        let body = "_push(1);".repeat(200);
        let src = format!("void main() {{ {} }}", body);
        let failure = build_source(&src, &AssemblerOptions::default()).unwrap_err();
        assert!(failure.assembly.is_some());
        assert_eq!(failure.diagnostics.len(), 1);
        assert!(failure.diagnostics[0].message.starts_with("Not enough space"));
        assert_eq!(failure.diagnostics[0].level, Level::Error);
    }
}
