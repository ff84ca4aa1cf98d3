use std::fmt;

use serde::{Deserialize, Serialize};
use uia_core_types::{Bounds, NodeId};

/// One node of the accessibility tree as reported by the device.
///
/// The JSON shape follows the uiautomator hierarchy dump with camelCase keys.
/// `id` and `index` are assigned by the tree when the snapshot is installed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiNode {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub content_desc: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub displayed: bool,
    #[serde(default)]
    pub children: Vec<UiNode>,
}

fn default_true() -> bool {
    true
}

impl UiNode {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            enabled: true,
            displayed: true,
            ..Self::default()
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }

    pub fn with_content_desc(mut self, desc: impl Into<String>) -> Self {
        self.content_desc = desc.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_child(mut self, child: UiNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle::new(self.id)
    }

    /// Attribute lookup by the names used in hierarchy dumps.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "resource-id" => self.resource_id.clone(),
            "content-desc" => self.content_desc.clone(),
            "class" => self.class_name.clone(),
            "text" => self.text.clone(),
            "package" => self.package.clone(),
            "enabled" => self.enabled.to_string(),
            "displayed" => self.displayed.to_string(),
            "bounds" => self.bounds.to_string(),
            "index" => self.index.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Nodes of this subtree in document (pre-)order, starting with `self`.
    pub fn descendants(&self) -> Vec<&UiNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn find_first<P>(&self, predicate: P) -> Option<&UiNode>
    where
        P: Fn(&UiNode) -> bool,
    {
        self.descendants().into_iter().find(|node| predicate(node))
    }

    pub fn find(&self, id: NodeId) -> Option<&UiNode> {
        self.find_first(|node| node.id == id)
    }
}

/// Opaque reference to a node obtained from one tree lookup.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeHandle {
    id: NodeId,
}

impl NodeHandle {
    pub fn new(id: NodeId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn token(&self) -> String {
        self.id.token()
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Node-attribute bundle handed to response serialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub element_id: String,
    pub resource_id: String,
    pub content_desc: String,
    pub class_name: String,
    pub text: String,
    pub package_name: String,
    pub bounds: Bounds,
    pub enabled: bool,
    pub displayed: bool,
}

impl From<&UiNode> for ElementInfo {
    fn from(node: &UiNode) -> Self {
        Self {
            element_id: node.id.token(),
            resource_id: node.resource_id.clone(),
            content_desc: node.content_desc.clone(),
            class_name: node.class_name.clone(),
            text: node.text.clone(),
            package_name: node.package.clone(),
            bounds: node.bounds,
            enabled: node.enabled,
            displayed: node.displayed,
        }
    }
}
