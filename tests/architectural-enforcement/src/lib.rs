//! Architectural Enforcement Integration Tests
//!
//! Source scans that keep the pipeline honest:
//! - No sleep() in production code; timers go through `tokio::time::interval`
//! - No blocking I/O inside async functions
//!
//! Everything after a `#[cfg(test)]` marker counts as test code and is
//! skipped, as are comments.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["pipeline/core/src", "pipeline/cli/src"];

/// Workspace root, resolved from this crate's manifest
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// A source line outside test code
#[derive(Clone, Debug)]
pub struct CodeLine {
    /// 1-based line number
    pub number: usize,
    /// Original line, trimmed
    pub text: String,
    /// Line with any `//` comment removed
    pub code: String,
}

/// A scanned Rust source file
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// File path
    pub path: PathBuf,
    /// Raw lines
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Read a file; `None` if unreadable
    pub fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Some(Self::from_source(path, &content))
    }

    /// Build from in-memory source
    pub fn from_source(path: &Path, content: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Lines before the first `#[cfg(test)]`, comments stripped
    pub fn production_lines(&self) -> Vec<CodeLine> {
        self.lines
            .iter()
            .enumerate()
            .take_while(|(_, line)| !line.trim().starts_with("#[cfg(test)]"))
            .filter_map(|(idx, line)| {
                let trimmed = line.trim();
                if trimmed.starts_with("//") {
                    return None;
                }
                let code = line.split("//").next().unwrap_or(line).to_string();
                Some(CodeLine {
                    number: idx + 1,
                    text: trimmed.to_string(),
                    code,
                })
            })
            .collect()
    }

    /// Whether the function enclosing line `idx` (0-based) is async
    ///
    /// Returns `None` at module level.
    pub fn enclosing_fn_is_async(&self, idx: usize) -> Option<bool> {
        for line in self.lines.iter().take(idx + 1).rev() {
            let line = line.trim();
            if let Some(is_async) = fn_signature(line) {
                return Some(is_async);
            }
            if line.starts_with("mod ") || line.starts_with("impl") {
                return None;
            }
        }
        None
    }

    /// Format a violation for this file
    pub fn violation(&self, line: &CodeLine, what: &str) -> String {
        format!(
            "{}:{} - {what}: {}",
            self.path.display(),
            line.number,
            line.text
        )
    }
}

/// `Some(is_async)` if the line opens a function, visibility included
fn fn_signature(line: &str) -> Option<bool> {
    let mut rest = line;
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
            break;
        }
    }
    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") || rest.starts_with("const fn ") {
        Some(false)
    } else {
        None
    }
}

/// All Rust files under the production directories
pub fn production_files() -> Vec<SourceFile> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .map(|dir| root.join(dir))
        .filter(|dir| dir.exists())
        .flat_map(|dir| {
            walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
                .filter_map(|entry| SourceFile::load(entry.path()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(code: &str) -> SourceFile {
        SourceFile::from_source(Path::new("sample.rs"), code)
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let file = source(
            "fn a() {}\n// note\nfn b() {} // trailing\n#[cfg(test)]\nmod tests {\n    fn c() {}\n}\n",
        );
        let lines = file.production_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].number, 3);
        assert!(!lines[1].code.contains("trailing"));
    }

    #[test]
    fn test_enclosing_fn_detection() {
        let file = source(
            "pub fn load() {\n    read();\n}\nasync fn run() {\n    work();\n}\nimpl Foo {\n    pub async fn go() {\n        x();\n    }\n}\n",
        );
        assert_eq!(file.enclosing_fn_is_async(1), Some(false));
        assert_eq!(file.enclosing_fn_is_async(4), Some(true));
        assert_eq!(file.enclosing_fn_is_async(8), Some(true));
    }

    #[test]
    fn test_production_dirs_exist() {
        for dir in PRODUCTION_DIRS {
            assert!(workspace_root().join(dir).exists(), "missing {dir}");
        }
    }
}
