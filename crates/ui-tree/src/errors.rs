use thiserror::Error;
use uia_core_types::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} is no longer part of the live tree")]
    Stale(NodeId),
    #[error("accessibility tree unavailable: {0}")]
    Unavailable(String),
    #[error("malformed tree: {0}")]
    Malformed(String),
}
