//! Error types for locator resolution

use thiserror::Error;
use ui_tree::TreeError;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// No node matched the locator
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A node or scope reference no longer exists in the live tree
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// The resolution scope left the tree; node ids are never reused, so
    /// retrying cannot help
    #[error("Stale search scope: {0}")]
    StaleScope(String),

    /// Selector failed structural validation
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Strategy name is not a known locator strategy
    #[error("Unknown locator strategy '{0}'")]
    UnknownStrategy(String),

    /// Strategy is known but this dispatcher cannot execute it
    #[error("Locator strategy '{0}' is not supported")]
    UnsupportedStrategy(String),

    /// Polling was interrupted before it could finish
    #[error("Resolution interrupted: {0}")]
    Interrupted(String),

    /// Tree access failed for a reason other than staleness
    #[error("Accessibility tree error: {0}")]
    Tree(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    /// Conditions the polling loop absorbs as an empty attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LocatorError::ElementNotFound(_) | LocatorError::StaleElement(_)
        )
    }
}

impl From<TreeError> for LocatorError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Stale(id) => LocatorError::StaleElement(format!(
                "{id} is no longer attached to the accessibility tree"
            )),
            TreeError::Unavailable(msg) | TreeError::Malformed(msg) => LocatorError::Tree(msg),
        }
    }
}
