//! Core types for locator resolution

use std::fmt;
use std::time::Duration;

use ui_tree::NodeHandle;

use crate::errors::LocatorError;

/// Total polling window when the caller supplies none.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Pause between two polling attempts. Not caller-configurable.
pub const POLL_BACKOFF_MS: u64 = 500;

/// Selector variants understood by the tree query dispatcher.
///
/// Id, label and class-name payloads must be non-empty; path and query
/// expressions may be empty and then simply match nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Resource identifier equality
    ById(String),

    /// Accessibility description equality
    ByLabel(String),

    /// Reported class name equality
    ByClassName(String),

    /// Path expression over the hierarchy
    ByPath(String),

    /// Declarative UiSelector query
    ByQueryLanguage(String),
}

impl Locator {
    pub fn by_id(value: impl Into<String>) -> Result<Self, LocatorError> {
        Self::ById(value.into()).validated()
    }

    pub fn by_label(value: impl Into<String>) -> Result<Self, LocatorError> {
        Self::ByLabel(value.into()).validated()
    }

    pub fn by_class_name(value: impl Into<String>) -> Result<Self, LocatorError> {
        Self::ByClassName(value.into()).validated()
    }

    pub fn by_path(expression: impl Into<String>) -> Self {
        Self::ByPath(expression.into())
    }

    pub fn by_query_language(expression: impl Into<String>) -> Self {
        Self::ByQueryLanguage(expression.into())
    }

    /// Selector payload
    pub fn value(&self) -> &str {
        match self {
            Locator::ById(value)
            | Locator::ByLabel(value)
            | Locator::ByClassName(value)
            | Locator::ByPath(value)
            | Locator::ByQueryLanguage(value) => value,
        }
    }

    /// Short variant name for logs and error context
    pub fn kind(&self) -> &'static str {
        match self {
            Locator::ById(_) => "id",
            Locator::ByLabel(_) => "label",
            Locator::ByClassName(_) => "class name",
            Locator::ByPath(_) => "path",
            Locator::ByQueryLanguage(_) => "query",
        }
    }

    /// Check the payload invariant of the active variant
    pub fn validate(&self) -> Result<(), LocatorError> {
        match self {
            Locator::ById(value) | Locator::ByLabel(value) | Locator::ByClassName(value)
                if value.is_empty() =>
            {
                Err(LocatorError::InvalidSelector(format!(
                    "{} locator requires a non-empty value",
                    self.kind()
                )))
            }
            _ => Ok(()),
        }
    }

    fn validated(self) -> Result<Self, LocatorError> {
        self.validate()?;
        Ok(self)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.kind(), self.value())
    }
}

/// Outcome of one dispatcher attempt: one node, or none found.
pub type CandidateMatch = Option<NodeHandle>;

/// A node handle together with how it was found.
///
/// Lives for a single command invocation; nothing caches it across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub handle: NodeHandle,
    pub locator: Locator,
    pub scope: Option<NodeHandle>,
    pub attempts: u32,
}

impl ResolvedElement {
    pub fn new(handle: NodeHandle, locator: Locator, scope: Option<NodeHandle>) -> Self {
        Self {
            handle,
            locator,
            scope,
            attempts: 1,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Per-request polling options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Ceiling on wall-clock time spent polling
    pub timeout: Duration,

    /// Report an exhausted poll as an empty success instead of not-found
    pub skip_if_missing: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            skip_if_missing: false,
        }
    }
}

impl FindOptions {
    pub fn new(timeout_ms: Option<u64>, skip: Option<bool>) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            skip_if_missing: skip.unwrap_or(false),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn skip_if_missing(mut self, skip: bool) -> Self {
        self.skip_if_missing = skip;
        self
    }
}
