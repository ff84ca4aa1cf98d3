use action_locator::LocatorError;
use thiserror::Error;
use ui_tree::TreeError;
use uia_core_types::IdError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
    #[error("malformed element reference: {0}")]
    InvalidElementId(#[from] IdError),
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("device call failed: {0}")]
    Device(String),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("command handler panicked: {0}")]
    Panicked(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    pub fn device(msg: impl Into<String>) -> Self {
        CommandError::Device(msg.into())
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        CommandError::InvalidPayload(msg.into())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::InvalidPayload(err.to_string())
    }
}
