use std::path::PathBuf;

use thiserror::Error;

/// The taxonomy of failure this crate's operations can produce. Kept small
/// and closed, so callers can match on it instead of string-sniffing a
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileSystem,
    ExternalTool,
    Database,
    Hashing,
    Configuration,
    Validation,
    Unknown,
}

/// Context attached to every [`DedupError`]: what was being done, to which
/// path, and under which cache/store key, as applicable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub path: Option<PathBuf>,
    pub operation: Option<String>,
    pub key: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut wrote = false;
        if let Some(op) = &self.operation {
            write!(f, "op={op}")?;
            wrote = true;
        }
        if let Some(path) = &self.path {
            write!(f, "{}path={}", if wrote { ", " } else { "" }, path.display())?;
            wrote = true;
        }
        if let Some(key) = &self.key {
            write!(f, "{}key={key}", if wrote { ", " } else { "" })?;
        }
        Ok(())
    }
}

/// A fallible operation's error, carrying one of the [`ErrorKind`]s, a
/// human-readable message, an optional cause, and the [`ErrorContext`] the
/// operation was running under.
#[derive(Error, Debug)]
#[error("{kind:?}: {message} ({context})")]
pub struct DedupError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: ErrorContext,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DedupError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: ErrorContext::new(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileSystem, message)
    }

    pub fn external_tool(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalTool, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn hashing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hashing, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
}

pub type DedupResult<T> = Result<T, DedupError>;
