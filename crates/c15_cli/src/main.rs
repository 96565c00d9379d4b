//! C15 CLI: new, compile, assemble, build, check.

use c15_asm::{AssemblerOptions, DEFAULT_MEMORY_LIMIT};
use c15_compiler::{print_diagnostics, render_diagnostics};
use c15_project::{find_package_root, load_manifest, Manifest, MANIFEST_FILE};
use c15_syntax::diagnostics::Diagnostic;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "c15")]
#[command(about = "C15 language toolchain")]
struct Cli {
    /// Log every pipeline stage to stderr
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new C15 project
    New { name: String },
    /// Compile a .c15s file to assembly (stdout unless -o is given)
    Compile {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Assemble a .c15 file into an artifact
    Assemble {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_MEMORY_LIMIT)]
        memory_limit: u32,
    },
    /// Build a project directory or a single .c15s file
    Build {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Compile and assemble, reporting diagnostics only
    Check { path: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("C15_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::New { name } => cmd_new(&name),
        Commands::Compile { path, output } => cmd_compile(&path, output.as_deref()),
        Commands::Assemble {
            path,
            output,
            memory_limit,
        } => cmd_assemble(&path, output.as_deref(), memory_limit),
        Commands::Build { path } => cmd_build(&path).map(|_| ()),
        Commands::Check { path } => cmd_check(&path),
    }
}

const MAIN_TEMPLATE: &str = r#"// Count up on the LEDs.
void main() {
    uint count = 0u;
    while (count < 16u) {
        _setled(count);
        count++;
    }
}
"#;

fn cmd_new(name: &str) -> Result<(), String> {
    create_project(Path::new(name))?;
    println!("Created project {}", name);
    Ok(())
}

fn create_project(dir: &Path) -> Result<(), String> {
    if dir.exists() {
        return Err(format!("Directory already exists: {}", dir.display()));
    }
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Invalid project name: {}", dir.display()))?;
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    std::fs::write(dir.join(MANIFEST_FILE), Manifest::template(&name)).map_err(|e| e.to_string())?;
    std::fs::write(dir.join("main.c15s"), MAIN_TEMPLATE).map_err(|e| e.to_string())?;
    Ok(())
}

fn read_file(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))
}

fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    std::fs::write(path, contents).map_err(|e| format!("failed to write {}: {}", path.display(), e))
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn cmd_compile(path: &Path, output: Option<&Path>) -> Result<(), String> {
    let source = read_file(path)?;
    let name = display_name(path);
    let compilation = c15_compiler::compile(&source).map_err(|e| {
        print_diagnostics(&name, &source, None, &[e.into()]);
        "Compilation failed".to_string()
    })?;
    print_diagnostics(&name, &source, None, &compilation.warnings);
    match output {
        Some(out) => {
            write_file(out, &compilation.assembly)?;
            println!("Wrote {}", out.display());
        }
        None => print!("{}", compilation.assembly),
    }
    Ok(())
}

fn cmd_assemble(path: &Path, output: Option<&Path>, memory_limit: u32) -> Result<(), String> {
    let text = read_file(path)?;
    let name = display_name(path);
    let options = AssemblerOptions { memory_limit };
    let assembled = c15_asm::assemble_with(&text, &options).map_err(|diags| {
        report(&name, &text, Some(&text), &diags);
        "Assembly failed".to_string()
    })?;
    report(&name, &text, Some(&text), &assembled.warnings);
    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.with_extension("json"));
    let json = assembled.artifact.to_json().map_err(|e| e.to_string())?;
    write_file(&out, &json)?;
    println!(
        "Wrote {} ({} / {} words)",
        out.display(),
        assembled.usage.total(),
        assembled.usage.limit
    );
    Ok(())
}

fn report(name: &str, source: &str, assembly: Option<&str>, diags: &[Diagnostic]) {
    for line in render_diagnostics(name, source, assembly, diags) {
        eprintln!("{}", line);
    }
}

/// What `c15 build` compiles and where it writes.
#[derive(Debug, PartialEq, Eq)]
struct BuildPlan {
    entry: PathBuf,
    out_dir: PathBuf,
    name: String,
    emit_asm: bool,
    options: AssemblerOptions,
}

/// A directory must hold c15.toml. A single .c15s file uses the manifest of
/// its package when there is one, otherwise defaults next to the file.
fn plan_build(path: &Path) -> Result<BuildPlan, String> {
    if path.is_dir() {
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(format!("No {} found in {}", MANIFEST_FILE, path.display()));
        }
        let manifest = load_manifest(&manifest_path).map_err(|e| e.to_string())?;
        return Ok(BuildPlan {
            entry: manifest.entry_path(path),
            out_dir: manifest.out_dir(path),
            name: manifest.package.name.clone(),
            emit_asm: manifest.build.emit_asm,
            options: AssemblerOptions {
                memory_limit: manifest.target.memory_limit,
            },
        });
    }
    if path.extension().map(|e| e != "c15s").unwrap_or(true) {
        return Err("Expected a .c15s file or a project directory".into());
    }
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    match find_package_root(path) {
        Some(root) => {
            let manifest = load_manifest(&root.join(MANIFEST_FILE)).map_err(|e| e.to_string())?;
            Ok(BuildPlan {
                entry: path.to_path_buf(),
                out_dir: manifest.out_dir(&root),
                name,
                emit_asm: manifest.build.emit_asm,
                options: AssemblerOptions {
                    memory_limit: manifest.target.memory_limit,
                },
            })
        }
        None => {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            Ok(BuildPlan {
                entry: path.to_path_buf(),
                out_dir: parent.join("dist"),
                name,
                emit_asm: true,
                options: AssemblerOptions::default(),
            })
        }
    }
}

/// Returns the artifact path.
fn cmd_build(path: &Path) -> Result<PathBuf, String> {
    let plan = plan_build(path)?;
    debug!(entry = %plan.entry.display(), out_dir = %plan.out_dir.display(), "build plan");
    let source = read_file(&plan.entry)?;
    let name = display_name(&plan.entry);
    let build = c15_compiler::build_source(&source, &plan.options).map_err(|failure| {
        print_diagnostics(&name, &source, failure.assembly.as_deref(), &failure.diagnostics);
        "Build failed".to_string()
    })?;
    let warnings: Vec<Diagnostic> = build.warnings().cloned().collect();
    print_diagnostics(&name, &source, Some(&build.compilation.assembly), &warnings);

    if plan.emit_asm {
        let asm_path = plan.out_dir.join(format!("{}.c15", plan.name));
        write_file(&asm_path, &build.compilation.assembly)?;
    }
    let out_path = plan.out_dir.join(format!("{}.json", plan.name));
    let json = build.assembled.artifact.to_json().map_err(|e| e.to_string())?;
    write_file(&out_path, &json)?;
    let usage = build.assembled.usage;
    println!(
        "Wrote {} ({} / {} words)",
        out_path.display(),
        usage.total(),
        usage.limit
    );
    Ok(out_path)
}

fn cmd_check(path: &Path) -> Result<(), String> {
    let text = read_file(path)?;
    let name = display_name(path);
    if path.extension().map(|e| e == "c15").unwrap_or(false) {
        return match c15_asm::assemble(&text) {
            Ok(assembled) => {
                report(&name, &text, Some(&text), &assembled.warnings);
                println!("{}: ok", name);
                Ok(())
            }
            Err(diags) => {
                report(&name, &text, Some(&text), &diags);
                Err("Check failed".into())
            }
        };
    }
    let options = find_package_root(path)
        .and_then(|root| load_manifest(&root.join(MANIFEST_FILE)).ok())
        .map(|m| AssemblerOptions {
            memory_limit: m.target.memory_limit,
        })
        .unwrap_or_default();
    match c15_compiler::build_source(&text, &options) {
        Ok(build) => {
            let warnings: Vec<Diagnostic> = build.warnings().cloned().collect();
            print_diagnostics(&name, &text, Some(&build.compilation.assembly), &warnings);
            println!("{}: ok", name);
            Ok(())
        }
        Err(failure) => {
            print_diagnostics(&name, &text, failure.assembly.as_deref(), &failure.diagnostics);
            Err("Check failed".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c15_asm::Artifact;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn new_project_builds() {
        let dir = scratch("c15_test_new_project");
        create_project(&dir).expect("create project");
        assert!(create_project(&dir).is_err(), "second create must fail");

        let plan = plan_build(&dir).expect("plan");
        assert_eq!(plan.name, "c15_test_new_project");
        assert_eq!(plan.entry, dir.join("main.c15s"));
        assert_eq!(plan.options.memory_limit, 500);

        let out = cmd_build(&dir).expect("build");
        let json = std::fs::read_to_string(&out).expect("read artifact");
        let artifact = Artifact::from_json(&json).expect("parse artifact");
        assert!(!artifact.stack.is_empty());
        assert!(dir.join("dist").join("c15_test_new_project.c15").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn single_file_without_manifest_uses_defaults() {
        let dir = scratch("c15_test_single_file");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("blink.c15s");
        std::fs::write(&file, "int x; void main() { x = 1; _setled(x); }").unwrap();
        let plan = plan_build(&file).expect("plan");
        assert_eq!(plan.name, "blink");
        assert_eq!(plan.out_dir, dir.join("dist"));
        assert_eq!(plan.options, AssemblerOptions::default());
        let out = cmd_build(&file).expect("build");
        assert_eq!(out, dir.join("dist").join("blink.json"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn manifest_limit_reaches_the_assembler() {
        let dir = scratch("c15_test_tight_limit");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(MANIFEST_FILE),
            "[package]\nname = \"tight\"\nversion = \"0.1.0\"\n[target]\nmemory_limit = 4\n",
        )
        .unwrap();
        std::fs::write(dir.join("main.c15s"), MAIN_TEMPLATE).unwrap();
        assert_eq!(cmd_build(&dir).unwrap_err(), "Build failed");
        assert!(cmd_check(&dir.join("main.c15s")).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn directory_without_manifest_is_rejected() {
        let dir = scratch("c15_test_no_manifest");
        std::fs::create_dir_all(&dir).unwrap();
        let err = plan_build(&dir).unwrap_err();
        assert!(err.starts_with("No c15.toml found"));
        assert!(plan_build(&dir.join("notes.txt")).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn assemble_writes_artifact_json() {
        let dir = scratch("c15_test_assemble");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("prog.c15");
        std::fs::write(&file, ".read a0 counter\nSTORE 5 a0\nHALT\n").unwrap();
        cmd_assemble(&file, None, DEFAULT_MEMORY_LIMIT).expect("assemble");
        let json = std::fs::read_to_string(dir.join("prog.json")).unwrap();
        assert!(json.contains("\"readRegions\""));
        let artifact = Artifact::from_json(&json).unwrap();
        assert_eq!(artifact.stack.len(), 3);
        assert_eq!(artifact.read_regions[0].address, 3);
        assert!(cmd_assemble(&file, None, 2).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn compile_and_check_report_errors() {
        let dir = scratch("c15_test_check");
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("good.c15s");
        let bad = dir.join("bad.c15s");
        std::fs::write(&good, "void main() { _push(1); }").unwrap();
        std::fs::write(&bad, "void main() { int x = 1.0; }").unwrap();
        assert!(cmd_check(&good).is_ok());
        assert_eq!(cmd_check(&bad).unwrap_err(), "Check failed");

        let asm = dir.join("good.c15");
        cmd_compile(&good, Some(&asm)).expect("compile");
        assert!(std::fs::read_to_string(&asm).unwrap().contains("CALL fn_main"));
        assert!(cmd_check(&asm).is_ok());
        assert_eq!(cmd_compile(&bad, None).unwrap_err(), "Compilation failed");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
