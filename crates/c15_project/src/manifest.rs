//! c15.toml manifest parsing.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "c15.toml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub package: Package,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub target: TargetConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Source file compiled by `c15 build`, relative to the package root.
    pub entry: String,
    pub out_dir: String,
    /// Also write the generated assembly next to the artifact.
    pub emit_asm: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entry: "main.c15s".to_string(),
            out_dir: "dist".to_string(),
            emit_asm: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    /// Words of code plus data the CPU can hold.
    pub memory_limit: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self { memory_limit: 500 }
    }
}

impl Manifest {
    /// Manifest written by `c15 new`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[package]
name = "{}"
version = "0.1.0"

[build]
entry = "main.c15s"
out_dir = "dist"
emit_asm = true

[target]
memory_limit = 500
"#,
            name
        )
    }

    pub fn entry_path(&self, root: &Path) -> PathBuf {
        root.join(&self.build.entry)
    }

    pub fn out_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.out_dir)
    }
}

pub fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
    Ok(toml::from_str(text)?)
}

pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&text)
}

/// Nearest ancestor of `path` (itself included) containing c15.toml.
pub fn find_package_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|p| p.join(MANIFEST_FILE).is_file())
        .map(PathBuf::from)
}
