//! Error type shared by the registry, tag handles and containers.

use thiserror::Error;

/// Errors produced by tag registration, tag handles and containers.
///
/// `TagNotExplicitlyPresent` and `UnknownTag` are non-fatal: the container
/// and persistence APIs log them as warnings and carry on. They are exposed
/// so callers can build or match them in their own reporting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// A declared name does not follow `label ('.' label)*`.
    #[error("invalid tag name '{name}': unexpected character at position {position}")]
    InvalidTagName { name: String, position: usize },

    /// The operation needs a registered tag but got the None handle
    /// (or a handle from another registry).
    #[error("cannot {0} on an invalid or None tag")]
    InvalidTagOperation(&'static str),

    /// `remove_tag` was asked to remove a tag the container never added explicitly.
    #[error("tag '{0}' is not explicitly present in the container")]
    TagNotExplicitlyPresent(String),

    /// A persisted name does not resolve against the current registry.
    #[error("no tag registered with name '{0}'")]
    UnknownTag(String),
}

pub type Result<T> = std::result::Result<T, TagError>;
