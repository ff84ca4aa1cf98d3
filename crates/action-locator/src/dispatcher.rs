//! Tree query dispatcher
//!
//! One attempt = refresh the tree, take a (possibly scoped) snapshot, run the
//! locator against it. Scoped native queries look at the scope's descendants;
//! path queries treat the scope as their document.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use ui_tree::{AccessibilityTree, NodeHandle, TreeError, UiNode};

use crate::errors::LocatorError;
use crate::types::{CandidateMatch, Locator};
use crate::uiselector::{QueryLanguageEvaluator, UiSelectorEvaluator};
use crate::xpath;

/// Runs a single lookup attempt
#[async_trait]
pub trait QueryDispatcher: Send + Sync {
    /// Look `locator` up once, under `scope` when given
    async fn resolve_once(
        &self,
        locator: &Locator,
        scope: Option<&NodeHandle>,
    ) -> Result<CandidateMatch, LocatorError>;
}

/// Dispatcher backed by an [`AccessibilityTree`]
pub struct TreeQueryDispatcher {
    tree: Arc<dyn AccessibilityTree>,
    query_language: Arc<dyn QueryLanguageEvaluator>,
}

impl TreeQueryDispatcher {
    pub fn new(tree: Arc<dyn AccessibilityTree>) -> Self {
        Self {
            tree,
            query_language: Arc::new(UiSelectorEvaluator::new()),
        }
    }

    /// Replace the default UiSelector evaluator
    pub fn with_query_language(mut self, evaluator: Arc<dyn QueryLanguageEvaluator>) -> Self {
        self.query_language = evaluator;
        self
    }

    /// Every node a path expression selects, in document order.
    pub async fn find_all(
        &self,
        expression: &str,
        scope: Option<&NodeHandle>,
    ) -> Result<Vec<NodeHandle>, LocatorError> {
        let compiled = xpath::compile(expression)?;
        let root = self.fresh_snapshot(scope).await?;
        Ok(compiled
            .evaluate(&root, scope.is_some())
            .into_iter()
            .map(UiNode::handle)
            .collect())
    }

    async fn fresh_snapshot(&self, scope: Option<&NodeHandle>) -> Result<UiNode, LocatorError> {
        self.tree.refresh().await?;
        self.tree.snapshot(scope).await.map_err(|err| match err {
            TreeError::Stale(id) if scope.is_some() => {
                LocatorError::StaleScope(format!("{id} is no longer part of the tree"))
            }
            other => other.into(),
        })
    }
}

/// First node of the subtree, in document order, satisfying `predicate`.
/// The scope node itself is never a candidate of a scoped search.
fn first_match<P>(root: &UiNode, scoped: bool, predicate: P) -> CandidateMatch
where
    P: Fn(&UiNode) -> bool,
{
    root.descendants()
        .into_iter()
        .skip(usize::from(scoped))
        .find(|node| predicate(node))
        .map(UiNode::handle)
}

#[async_trait]
impl QueryDispatcher for TreeQueryDispatcher {
    #[instrument(skip(self, locator), fields(locator = %locator))]
    async fn resolve_once(
        &self,
        locator: &Locator,
        scope: Option<&NodeHandle>,
    ) -> Result<CandidateMatch, LocatorError> {
        locator.validate()?;
        let root = self.fresh_snapshot(scope).await?;
        let scoped = scope.is_some();

        let candidate = match locator {
            Locator::ById(id) => first_match(&root, scoped, |node| node.resource_id == *id),
            Locator::ByLabel(label) => {
                first_match(&root, scoped, |node| node.content_desc == *label)
            }
            Locator::ByClassName(class) => {
                first_match(&root, scoped, |node| node.class_name == *class)
            }
            Locator::ByPath(expression) => xpath::compile(expression)?
                .evaluate(&root, scoped)
                .first()
                .map(|node| node.handle()),
            Locator::ByQueryLanguage(expression) => {
                self.query_language.find_first(expression, &root, scoped)?
            }
        };

        debug!(found = candidate.is_some(), "dispatcher attempt finished");
        Ok(candidate)
    }
}
