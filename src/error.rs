//! Error types for rendering operations.

use thiserror::Error;

/// Errors that can occur while loading a profile or rendering a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse markdown: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid formatting profile: {0}")]
    Profile(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid color {0:?}: expected #rrggbb or #rrggbbaa")]
    InvalidColor(String),
}

/// Failures reported by a [`crate::MarkdownParser`].
///
/// A parse failure aborts the whole render; nothing is recovered per element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("elements nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("event stream left {open} element(s) open")]
    Unbalanced { open: usize },

    #[error("event stream closed an element that was never opened")]
    UnexpectedEnd,
}

/// Failures reported by a [`crate::ImageLoader`].
///
/// A failed load still completes its image; it is never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("no loader for {0}:// urls")]
    UnsupportedScheme(String),

    #[error("failed to read {url}: {message}")]
    Io { url: url::Url, message: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
