//! Error taxonomy shared by every component.
//!
//! All fallible operations return [`FoundryError`]. Each variant maps to one
//! error *kind* ([`ErrorKind`]) so callers can branch on the category without
//! caring about the payload:
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | `InvalidArgument` | empty path, empty step name, zero workers, empty glob |
//! | `NotFound` | a template glob matched zero files |
//! | `Io` | a filesystem operation failed (other than an expected "not present") |
//! | `Parse` | malformed translation file, template glob, or template |
//! | `Render` | template execution failed |
//! | `ActionPanic` | a fan-out action panicked |
//!
//! Every rendered message starts with `foundry: ` so errors surfacing from a
//! larger program can be traced back to this library.

use std::io;
use thiserror::Error;

pub type Result<T, E = FoundryError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum FoundryError {
    #[error("foundry: {0}")]
    InvalidArgument(String),
    #[error("foundry: {0}")]
    NotFound(String),
    #[error("foundry: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("foundry: {context}: {message}")]
    Parse { context: String, message: String },
    #[error("foundry: {context}: {message}")]
    Render { context: String, message: String },
    #[error("foundry: panic in parallel worker: {0}")]
    ActionPanic(String),
}

/// Category of a [`FoundryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Io,
    Parse,
    Render,
    ActionPanic,
}

impl FoundryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FoundryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FoundryError::NotFound(_) => ErrorKind::NotFound,
            FoundryError::Io { .. } => ErrorKind::Io,
            FoundryError::Parse { .. } => ErrorKind::Parse,
            FoundryError::Render { .. } => ErrorKind::Render,
            FoundryError::ActionPanic(_) => ErrorKind::ActionPanic,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        FoundryError::InvalidArgument(message.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        FoundryError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        FoundryError::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn render(context: impl Into<String>, message: impl ToString) -> Self {
        FoundryError::Render {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Attach a context string to an `io::Result`, producing [`FoundryError::Io`].
pub(crate) trait IoContext<T> {
    fn io_context(self, context: &str) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context(self, context: &str) -> Result<T> {
        self.map_err(|e| FoundryError::io(context, e))
    }
}
