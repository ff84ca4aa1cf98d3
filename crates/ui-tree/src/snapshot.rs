use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;
use uia_core_types::NodeId;

use crate::api::AccessibilityTree;
use crate::errors::TreeError;
use crate::model::{ElementInfo, NodeHandle, UiNode};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory accessibility tree.
///
/// Installing new content (directly with [`SnapshotTree::replace_root`] or on
/// the next refresh after [`SnapshotTree::stage_redraw`]) assigns fresh node
/// ids, so every handle issued against the previous content turns stale.
pub struct SnapshotTree {
    root: RwLock<UiNode>,
    pending: Mutex<Option<UiNode>>,
    generation: AtomicU64,
    refreshes: AtomicU64,
}

impl SnapshotTree {
    pub fn new(root: UiNode) -> Self {
        Self {
            root: RwLock::new(install(root)),
            pending: Mutex::new(None),
            generation: AtomicU64::new(1),
            refreshes: AtomicU64::new(0),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, TreeError> {
        let root: UiNode =
            serde_json::from_str(raw).map_err(|err| TreeError::Malformed(err.to_string()))?;
        Ok(Self::new(root))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|err| {
            TreeError::Unavailable(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Current content, ids included.
    pub fn root(&self) -> UiNode {
        self.root.read().clone()
    }

    /// Swap the content immediately, as if the app redrew between two reads.
    pub fn replace_root(&self, root: UiNode) {
        *self.root.write() = install(root);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "accessibility tree replaced");
    }

    /// Content that becomes visible on the next `refresh`.
    pub fn stage_redraw(&self, root: UiNode) {
        *self.pending.lock() = Some(root);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessibilityTree for SnapshotTree {
    async fn refresh(&self) -> Result<(), TreeError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let staged = self.pending.lock().take();
        if let Some(root) = staged {
            self.replace_root(root);
        }
        Ok(())
    }

    async fn snapshot(&self, scope: Option<&NodeHandle>) -> Result<UiNode, TreeError> {
        let root = self.root.read();
        match scope {
            None => Ok(root.clone()),
            Some(handle) => root
                .find(handle.id())
                .cloned()
                .ok_or(TreeError::Stale(handle.id())),
        }
    }

    async fn element_info(&self, handle: &NodeHandle) -> Result<ElementInfo, TreeError> {
        self.root
            .read()
            .find(handle.id())
            .map(ElementInfo::from)
            .ok_or(TreeError::Stale(handle.id()))
    }
}

fn install(mut root: UiNode) -> UiNode {
    assign_ids(&mut root, 0);
    root
}

fn assign_ids(node: &mut UiNode, index: usize) {
    node.id = NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed));
    node.index = index;
    for (position, child) in node.children.iter_mut().enumerate() {
        assign_ids(child, position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_screen() -> UiNode {
        UiNode::new("android.widget.FrameLayout").with_child(
            UiNode::new("android.widget.Button").with_resource_id("com.example:id/login"),
        )
    }

    #[tokio::test]
    async fn ids_are_unique_and_indexes_follow_siblings() {
        let tree = SnapshotTree::new(
            UiNode::new("root")
                .with_child(UiNode::new("a"))
                .with_child(UiNode::new("b")),
        );
        let root = tree.snapshot(None).await.unwrap();
        assert_ne!(root.id, root.children[0].id);
        assert_ne!(root.children[0].id, root.children[1].id);
        assert_eq!(root.children[1].index, 1);
    }

    #[tokio::test]
    async fn replaced_content_makes_old_handles_stale() {
        let tree = SnapshotTree::new(login_screen());
        let button = tree.root().children[0].handle();
        assert!(tree.element_info(&button).await.is_ok());

        tree.replace_root(login_screen());
        assert_eq!(
            tree.element_info(&button).await,
            Err(TreeError::Stale(button.id()))
        );
        assert!(matches!(
            tree.snapshot(Some(&button)).await,
            Err(TreeError::Stale(_))
        ));
    }

    #[tokio::test]
    async fn staged_redraw_lands_on_refresh() {
        let tree = SnapshotTree::new(login_screen());
        let before = tree.generation();
        tree.stage_redraw(UiNode::new("android.widget.FrameLayout"));
        assert_eq!(tree.generation(), before);

        tree.refresh().await.unwrap();
        assert_eq!(tree.generation(), before + 1);
        assert_eq!(tree.refresh_count(), 1);
        assert!(tree.root().children.is_empty());
    }

    #[tokio::test]
    async fn scoped_snapshot_is_the_subtree() {
        let tree = SnapshotTree::new(login_screen());
        let button = tree.root().children[0].handle();
        let scoped = tree.snapshot(Some(&button)).await.unwrap();
        assert_eq!(scoped.class_name, "android.widget.Button");
        assert!(scoped.children.is_empty());
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            SnapshotTree::from_json("{not json"),
            Err(TreeError::Malformed(_))
        ));
    }
}
