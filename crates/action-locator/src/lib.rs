//! Locator resolution for the UI-automation command engine
//!
//! This crate turns an abstract selector into a node of the live
//! accessibility tree:
//! - Strategy parsing with package-qualified id rewriting
//! - One-shot tree query dispatch per locator variant
//! - Path-expression and UiSelector query evaluation over tree snapshots
//! - Bounded polling that absorbs not-found and stale attempts

pub mod dispatcher;
pub mod errors;
pub mod resolver;
pub mod retry;
pub mod strategies;
pub mod types;
pub mod uiselector;
pub mod xpath;

pub use dispatcher::*;
pub use errors::*;
pub use resolver::*;
pub use retry::{poll_until, PollError, PollOutcome, RetryPolicy};
pub use strategies::*;
pub use types::*;
pub use uiselector::{QueryLanguageEvaluator, UiSelectorEvaluator};
