//! Error types for the content pipeline

use thiserror::Error;

/// Errors raised while loading, parsing or rendering site content
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed front-matter in {source_id}: {reason}")]
    MalformedFrontMatter { source_id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(source_id: &str, reason: impl Into<String>) -> Self {
        Error::MalformedFrontMatter {
            source_id: source_id.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A link or image reference that could not be resolved against the base path.
///
/// Never fatal: the renderer emits a placeholder and carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedAsset {
    /// The reference as written in the Markdown source
    pub reference: String,
    /// Whether the reference came from an image (as opposed to a link)
    pub image: bool,
    pub reason: String,
}

impl std::fmt::Display for UnresolvedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.image { "image" } else { "link" };
        write!(f, "unresolved {} '{}': {}", kind, self.reference, self.reason)
    }
}
