//! Expression file discovery
//!
//! Batch input is either a single file or a directory tree of expression files. Each file
//! holds one or more expressions separated by blank lines. A block is named `file:line` after
//! the file line it starts on; positions in its diagnostics count from the block's first line.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use walkdir::WalkDir;

use crate::diagnostics::SourceContext;

/// Extensions treated as expression files when walking a directory.
pub const EXPRESSION_EXTENSIONS: [&str; 3] = ["alpha", "expr", "txt"];

#[derive(Error, Diagnostic, Debug)]
pub enum DiscoveryError {
    #[error("failed to walk directory {path}")]
    #[diagnostic(code(wqb::discovery::walk))]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read expression file {path}")]
    #[diagnostic(code(wqb::discovery::io))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One expression block taken from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionBlock {
    /// Display name, `file:line`.
    pub name: String,
    /// 1-based line of the block's first line in its file.
    pub line: usize,
    pub text: String,
}

impl ExpressionBlock {
    /// Source context for validating this block. Line 1 is the block's first line.
    pub fn source(&self) -> SourceContext {
        SourceContext::new(&*self.name, &*self.text)
    }
}

/// Finds expression files and splits them into blocks.
#[derive(Debug)]
pub struct ExpressionDiscoverer;

impl ExpressionDiscoverer {
    /// Returns `root` itself when it is a file, otherwise every expression file below it.
    ///
    /// Directory results are sorted so batch output is stable.
    pub fn discover_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>, DiscoveryError> {
        let root = root.as_ref();
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                path: root.display().to_string(),
                source,
            })?;
            if !entry.file_type().is_file() || !Self::is_expression_file(entry.path()) {
                continue;
            }
            files.push(entry.path().to_path_buf());
        }
        files.sort();
        tracing::debug!(root = %root.display(), files = files.len(), "discovered expression files");
        Ok(files)
    }

    /// Reads a file and splits it into expression blocks.
    pub fn read_blocks<P: AsRef<Path>>(path: P) -> Result<Vec<ExpressionBlock>, DiscoveryError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
            path: display.clone(),
            source,
        })?;
        Ok(Self::split_blocks(&display, &content))
    }

    /// Reads every block under `root`, in file order then block order.
    pub fn collect_blocks<P: AsRef<Path>>(root: P) -> Result<Vec<ExpressionBlock>, DiscoveryError> {
        let mut blocks = Vec::new();
        for file in Self::discover_files(root)? {
            blocks.extend(Self::read_blocks(&file)?);
        }
        Ok(blocks)
    }

    /// Splits `content` on lines that are empty or whitespace only.
    pub fn split_blocks(name: &str, content: &str) -> Vec<ExpressionBlock> {
        let mut blocks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut start = 0;

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                Self::flush(name, start, &mut current, &mut blocks);
                continue;
            }
            if current.is_empty() {
                start = index + 1;
            }
            current.push(line);
        }
        Self::flush(name, start, &mut current, &mut blocks);
        blocks
    }

    fn flush(name: &str, line: usize, current: &mut Vec<&str>, blocks: &mut Vec<ExpressionBlock>) {
        if current.is_empty() {
            return;
        }
        blocks.push(ExpressionBlock {
            name: format!("{}:{}", name, line),
            line,
            text: current.join("\n"),
        });
        current.clear();
    }

    fn is_expression_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXPRESSION_EXTENSIONS.contains(&ext))
    }
}
