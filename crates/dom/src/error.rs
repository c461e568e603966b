// ABOUTME: Error types for DOM helper operations.
// ABOUTME: Provides the DomError enum and a crate-wide Result alias.

use ego_tree::NodeId;
use thiserror::Error;

/// Errors surfaced by document mutations and the DOM helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The handle does not address a node in this document.
    #[error("node {0:?} does not exist in this document")]
    NodeNotFound(NodeId),

    /// The node exists but is not an element.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// The node cannot be detached because it has no parent.
    #[error("node {0:?} has no parent")]
    NoParent(NodeId),

    /// A class token was empty or contained whitespace.
    #[error("invalid class token {0:?}")]
    InvalidToken(String),

    /// A non-final step of a subtree path named no child.
    #[error("no child matches path step {step:?} at depth {depth}")]
    PathLookup { depth: usize, step: String },

    /// The insertion would make a node its own ancestor, or targets a leaf.
    #[error("cannot insert {child:?} under {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    /// The host lacks the capability the call needs.
    #[error("host does not support {0}")]
    Unsupported(&'static str),
}

impl DomError {
    /// Creates an InvalidToken error from any token-like value.
    pub fn invalid_token(token: impl Into<String>) -> Self {
        DomError::InvalidToken(token.into())
    }

    /// Returns true if this is a NodeNotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomError::NodeNotFound(_))
    }

    /// Returns true if this is a PathLookup error.
    pub fn is_path_lookup(&self) -> bool {
        matches!(self, DomError::PathLookup { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DomError>;
