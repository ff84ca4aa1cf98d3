use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

const NODE_TOKEN_PREFIX: &str = "node-";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("malformed element id '{0}'")]
    MalformedElementId(String),
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one node in the live accessibility tree.
///
/// Ids are never reused across tree generations, so an id that no longer
/// occurs in the tree marks a stale reference. The textual form (`node-<n>`)
/// is the element token handed to clients.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn token(&self) -> String {
        format!("{NODE_TOKEN_PREFIX}{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NODE_TOKEN_PREFIX}{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .strip_prefix(NODE_TOKEN_PREFIX)
            .and_then(|digits| digits.parse::<u64>().ok())
            .map(NodeId)
            .ok_or_else(|| IdError::MalformedElementId(raw.to_string()))
    }
}

/// Screen rectangle in device pixels, `right`/`bottom` exclusive.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_token_round_trips() {
        let id = NodeId(42);
        assert_eq!(id.token(), "node-42");
        assert_eq!("node-42".parse::<NodeId>(), Ok(id));
        assert_eq!(" node-7 ".parse::<NodeId>(), Ok(NodeId(7)));
    }

    #[test]
    fn malformed_node_tokens_are_rejected() {
        assert!("42".parse::<NodeId>().is_err());
        assert!("node-".parse::<NodeId>().is_err());
        assert!("node-abc".parse::<NodeId>().is_err());
    }

    #[test]
    fn bounds_center_and_display() {
        let bounds = Bounds::new(0, 100, 200, 300);
        assert_eq!(bounds.center(), (100, 200));
        assert_eq!(bounds.to_string(), "[0,100][200,300]");
        assert!(!bounds.is_empty());
        assert!(Bounds::new(10, 10, 10, 50).is_empty());
    }
}
