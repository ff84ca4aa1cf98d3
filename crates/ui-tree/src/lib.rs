//! Accessibility tree model shared by the locator engine and command handlers.
//!
//! The live tree is an external collaborator; [`AccessibilityTree`] is the
//! seam the engine queries through and [`SnapshotTree`] is the in-memory
//! implementation used by the local runtime and by tests.

pub mod api;
pub mod errors;
pub mod model;
pub mod snapshot;

pub use api::AccessibilityTree;
pub use errors::TreeError;
pub use model::{ElementInfo, NodeHandle, UiNode};
pub use snapshot::SnapshotTree;
pub use uia_core_types::{Bounds, NodeId};
