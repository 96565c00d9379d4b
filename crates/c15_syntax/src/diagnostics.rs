//! Diagnostics (errors, warnings) with file/line spans.

use crate::span::{FileId, Location, Span};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub location: Option<Location>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            location,
        }
    }

    pub fn warning(message: impl Into<String>, location: Option<Location>) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    pub fn span(&self) -> Option<Span> {
        self.location.map(|l| l.span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Error => "error",
            Level::Warning => "warning",
        };
        if let Some(loc) = &self.location {
            write!(f, "{} at {}: {}", level, loc.span, self.message)
        } else {
            write!(f, "{}: {}", level, self.message)
        }
    }
}

/// True if any diagnostic in the list is an error.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

/// Convert byte offset to line/column (1-based) given source.
pub fn offset_to_line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = offset as usize;
    if offset >= source.len() {
        let lines = source.lines().count() as u32;
        let last_line_len = source.lines().last().map(|l| l.len()).unwrap_or(0) as u32;
        return (lines.max(1), last_line_len + 1);
    }
    let mut line = 1u32;
    let mut col = 1u32;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Format a diagnostic with source line (for printing).
pub fn format_diagnostic(source: &str, file_name: &str, diag: &Diagnostic) -> String {
    let level = match diag.level {
        Level::Error => "error",
        Level::Warning => "warning",
    };
    let loc = match &diag.location {
        Some(l) => l,
        None => return format!("{}: {}: {}", file_name, level, diag.message),
    };
    let (line, col) = offset_to_line_col(source, loc.span.start);
    let line_content = source
        .lines()
        .nth((line as usize).saturating_sub(1))
        .unwrap_or("");
    let (end_line, col_end) = offset_to_line_col(source, loc.span.end);
    let underline = if end_line == line
        && col_end > col
        && (col_end as usize) <= line_content.len() + 1
    {
        " ".repeat((col as usize).saturating_sub(1)) + &"^".repeat((col_end - col) as usize)
    } else {
        " ".repeat((col as usize).saturating_sub(1)) + "^"
    };
    format!(
        "{}:{}:{}: {}: {}\n  {} | {}\n  {} | {}",
        file_name, line, col, level, diag.message, line, line_content, line, underline
    )
}

/// Location in the given file.
pub fn at(file: FileId, span: Span) -> Option<Location> {
    Some(Location::new(file, span))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_is_one_based() {
        let src = "int x;\nint y;\n";
        assert_eq!(offset_to_line_col(src, 0), (1, 1));
        assert_eq!(offset_to_line_col(src, 7), (2, 1));
        assert_eq!(offset_to_line_col(src, 11), (2, 5));
    }

    #[test]
    fn format_underlines_the_span() {
        let src = "int main() {\n  x = 1;\n}\n";
        let diag = Diagnostic::error("Unknown variable: x", at(FileId::SOURCE, Span::new(15, 16)));
        let out = format_diagnostic(src, "main.c15s", &diag);
        assert!(out.starts_with("main.c15s:2:3: error: Unknown variable: x"));
        assert!(out.ends_with("  2 |   ^"));
    }

    #[test]
    fn unlocated_diagnostic_has_no_source_excerpt() {
        let diag = Diagnostic::error("Not enough space, (10,600).", None);
        assert_eq!(
            format_diagnostic("", "a.c15", &diag),
            "a.c15: error: Not enough space, (10,600)."
        );
    }
}
