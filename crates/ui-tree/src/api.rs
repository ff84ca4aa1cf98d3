use async_trait::async_trait;

use crate::errors::TreeError;
use crate::model::{ElementInfo, NodeHandle, UiNode};

/// Access to the live accessibility tree of the application under test.
///
/// Implementations own their consistency across concurrent readers; the
/// engine takes no locks of its own around these calls.
#[async_trait]
pub trait AccessibilityTree: Send + Sync {
    /// Re-sync the cached snapshot with the device. Called before every lookup.
    async fn refresh(&self) -> Result<(), TreeError>;

    /// Whole tree when `scope` is `None`, otherwise the scope node's subtree.
    async fn snapshot(&self, scope: Option<&NodeHandle>) -> Result<UiNode, TreeError>;

    /// Live attributes of a previously resolved node.
    async fn element_info(&self, handle: &NodeHandle) -> Result<ElementInfo, TreeError>;
}
