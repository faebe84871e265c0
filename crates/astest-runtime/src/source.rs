//! Source file loading
//!
//! A [`SourceLoader`] reads each path at most once and hands out shared,
//! immutable [`SourceFile`]s. The same loader serves the parse and every
//! failure snippet of a run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

/// Source loading errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// The path does not name a regular file
    #[error("'{}' doesn't exist.", path.display())]
    FileMissing { path: PathBuf },
    /// The file exists but could not be read
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The full text of one source file
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    /// `text` split into lines, without terminators
    pub lines: Vec<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.lines().map(str::to_string).collect();
        Self {
            path: path.into(),
            text,
            lines,
        }
    }
}

/// Memoizing reader of source files, keyed by path
#[derive(Debug, Default)]
pub struct SourceLoader {
    cache: RefCell<HashMap<PathBuf, Rc<SourceFile>>>,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, reading it from disk only on first use
    pub fn load(&self, path: &Path) -> Result<Rc<SourceFile>, SourceError> {
        if let Some(file) = self.cache.borrow().get(path) {
            trace!(path = %path.display(), "source cache hit");
            return Ok(Rc::clone(file));
        }

        if !path.is_file() {
            return Err(SourceError::FileMissing {
                path: path.to_path_buf(),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = text.len(), "loaded source");

        let file = Rc::new(SourceFile::new(path, text));
        self.cache
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&file));
        Ok(file)
    }

    /// Number of files loaded so far
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}
