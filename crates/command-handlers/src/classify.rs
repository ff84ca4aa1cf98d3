//! Failure classification
//!
//! Every error raised while handling a command ends up here exactly once, in
//! the router, and is reduced to an [`ErrorCategory`] plus context.

use action_locator::LocatorError;
use serde::Serialize;
use ui_tree::TreeError;

use crate::errors::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    Stale,
    InvalidArgument,
    Unimplemented,
    Unexpected,
}

impl ErrorCategory {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "no such element",
            ErrorCategory::Stale => "stale element reference",
            ErrorCategory::InvalidArgument => "invalid argument",
            ErrorCategory::Unimplemented => "unknown method",
            ErrorCategory::Unexpected => "unknown error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => {
                "An element could not be located on the page using the given search parameters"
            }
            ErrorCategory::Stale => "The element reference is no longer attached to the UI tree",
            ErrorCategory::InvalidArgument => "The arguments passed to the command are invalid",
            ErrorCategory::Unimplemented => "The requested command or strategy is not implemented",
            ErrorCategory::Unexpected => {
                "An unknown server-side error occurred while processing the command"
            }
        }
    }
}

/// A classified failure, ready for serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub category: ErrorCategory,
    pub message: String,
    pub origin: Option<String>,
}

impl Failure {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Pure mapping from an error to its category.
pub fn categorize(err: &CommandError) -> ErrorCategory {
    match err {
        CommandError::InvalidPayload(_) | CommandError::InvalidElementId(_) => {
            ErrorCategory::InvalidArgument
        }
        CommandError::Locator(err) => categorize_locator(err),
        CommandError::Tree(err) => categorize_tree(err),
        CommandError::UnknownCommand(_) => ErrorCategory::Unimplemented,
        CommandError::Device(_) | CommandError::Panicked(_) | CommandError::Internal(_) => {
            ErrorCategory::Unexpected
        }
    }
}

fn categorize_locator(err: &LocatorError) -> ErrorCategory {
    match err {
        LocatorError::ElementNotFound(_) => ErrorCategory::NotFound,
        LocatorError::StaleElement(_) | LocatorError::StaleScope(_) => ErrorCategory::Stale,
        LocatorError::InvalidSelector(_) | LocatorError::UnknownStrategy(_) => {
            ErrorCategory::InvalidArgument
        }
        LocatorError::UnsupportedStrategy(_) => ErrorCategory::Unimplemented,
        LocatorError::Interrupted(_) | LocatorError::Tree(_) | LocatorError::Internal(_) => {
            ErrorCategory::Unexpected
        }
    }
}

fn categorize_tree(err: &TreeError) -> ErrorCategory {
    match err {
        TreeError::Stale(_) => ErrorCategory::Stale,
        TreeError::Unavailable(_) | TreeError::Malformed(_) => ErrorCategory::Unexpected,
    }
}

/// Classify `err` raised while running `origin`.
pub fn classify(err: &CommandError, origin: Option<&str>) -> Failure {
    let failure = Failure::new(categorize(err), err.to_string());
    match origin {
        Some(origin) => failure.with_origin(origin),
        None => failure,
    }
}
