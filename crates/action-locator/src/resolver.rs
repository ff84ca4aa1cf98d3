//! Polling element resolver
//!
//! Drives the dispatcher through [`poll_until`] until a node turns up or the
//! caller's deadline passes.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use ui_tree::NodeHandle;

use crate::dispatcher::QueryDispatcher;
use crate::errors::LocatorError;
use crate::retry::{poll_until, PollError, PollOutcome, RetryPolicy};
use crate::types::{FindOptions, Locator, ResolvedElement};

/// Resolves locators by polling a [`QueryDispatcher`]
#[derive(Clone)]
pub struct PollingResolver {
    dispatcher: Arc<dyn QueryDispatcher>,
}

impl PollingResolver {
    pub fn new(dispatcher: Arc<dyn QueryDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Resolve `locator` under `scope`.
    ///
    /// Returns `Ok(None)` only when the poll is exhausted and the caller asked
    /// to skip missing elements. Not-found and stale attempts are retried;
    /// any other failure is returned as soon as it happens.
    #[instrument(
        skip_all,
        fields(
            locator = %locator,
            timeout_ms = options.timeout.as_millis() as u64,
            skip = options.skip_if_missing,
        )
    )]
    pub async fn resolve(
        &self,
        locator: &Locator,
        scope: Option<NodeHandle>,
        options: &FindOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<ResolvedElement>, LocatorError> {
        locator.validate()?;

        let policy = RetryPolicy::from(options);
        let dispatcher = &self.dispatcher;
        let outcome = poll_until(
            &policy,
            cancel,
            move |attempt| async move {
                debug!(attempt, "dispatching lookup");
                dispatcher.resolve_once(locator, scope.as_ref()).await
            },
            LocatorError::is_transient,
        )
        .await;

        match outcome {
            Ok(PollOutcome::Resolved { value, attempts }) => {
                info!(attempts, element = %value, "element resolved");
                Ok(Some(
                    ResolvedElement::new(value, locator.clone(), scope).with_attempts(attempts),
                ))
            }
            Ok(PollOutcome::Exhausted {
                attempts,
                last_error,
            }) => {
                if options.skip_if_missing {
                    info!(attempts, "element absent, skipping");
                    return Ok(None);
                }
                if let Some(err) = last_error {
                    debug!(error = %err, "last attempt failed transiently");
                }
                Err(LocatorError::ElementNotFound(format!(
                    "no element matched {locator} after {attempts} attempt(s) within {} ms",
                    options.timeout.as_millis()
                )))
            }
            Err(PollError::Fatal { error, attempts }) => {
                debug!(attempts, error = %error, "lookup failed");
                Err(error)
            }
            Err(PollError::Interrupted { attempts }) => Err(LocatorError::Interrupted(format!(
                "lookup for {locator} cancelled after {attempts} attempt(s)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use crate::types::CandidateMatch;
    use uia_core_types::NodeId;

    /// Replays a fixed script of attempt results, then repeats the last one.
    struct ScriptedDispatcher {
        script: Vec<Result<CandidateMatch, LocatorError>>,
        calls: Mutex<Vec<Duration>>,
        started: Instant,
    }

    impl ScriptedDispatcher {
        fn new(script: Vec<Result<CandidateMatch, LocatorError>>) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: Mutex::new(Vec::new()),
                started: Instant::now(),
            })
        }

        fn misses_then_match(misses: usize) -> Arc<Self> {
            let mut script: Vec<_> = (0..misses).map(|_| Ok(None)).collect();
            script.push(Ok(Some(target())));
            Self::new(script)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn call_times(&self) -> Vec<u128> {
            self.calls.lock().iter().map(|d| d.as_millis()).collect()
        }
    }

    #[async_trait]
    impl QueryDispatcher for ScriptedDispatcher {
        async fn resolve_once(
            &self,
            _locator: &Locator,
            _scope: Option<&NodeHandle>,
        ) -> Result<CandidateMatch, LocatorError> {
            let index = {
                let mut calls = self.calls.lock();
                calls.push(self.started.elapsed());
                calls.len() - 1
            };
            let step = index.min(self.script.len() - 1);
            self.script[step].clone()
        }
    }

    fn target() -> NodeHandle {
        NodeHandle::new(NodeId(42))
    }

    fn login() -> Locator {
        Locator::ById("com.example:id/login_button".into())
    }

    fn options(timeout_ms: u64, skip: bool) -> FindOptions {
        FindOptions::new(Some(timeout_ms), Some(skip))
    }

    async fn run(
        dispatcher: Arc<ScriptedDispatcher>,
        options: FindOptions,
    ) -> Result<Option<ResolvedElement>, LocatorError> {
        PollingResolver::new(dispatcher)
            .resolve(&login(), None, &options, &CancellationToken::new())
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_match_uses_one_attempt() {
        let dispatcher = ScriptedDispatcher::misses_then_match(0);
        let resolved = run(dispatcher.clone(), options(2_000, false))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.handle, target());
        assert_eq!(resolved.attempts, 1);
        assert_eq!(resolved.locator, login());
        assert_eq!(dispatcher.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn converges_once_the_tree_settles() {
        for misses in 0..=4usize {
            let dispatcher = ScriptedDispatcher::misses_then_match(misses);
            let resolved = run(dispatcher.clone(), options(5_000, false))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(resolved.attempts as usize, misses + 1);
            assert_eq!(dispatcher.call_count(), misses + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_match_past_the_deadline_is_not_found() {
        // attempts land at 0, 500 and 1000 ms; the match would come at 1500
        let dispatcher = ScriptedDispatcher::misses_then_match(3);
        let result = run(dispatcher.clone(), options(1_000, false)).await;
        assert!(matches!(result, Err(LocatorError::ElementNotFound(_))));
        assert_eq!(dispatcher.call_times(), vec![0, 500, 1_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_yields_nothing_exactly_at_the_deadline() {
        let dispatcher = ScriptedDispatcher::new(vec![Ok(None)]);
        let started = Instant::now();
        let result = run(dispatcher.clone(), options(1_000, true)).await;
        assert_eq!(result, Ok(None));
        assert_eq!(started.elapsed(), Duration::from_millis(1_000));
        assert_eq!(dispatcher.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_attempts_are_retried() {
        let dispatcher = ScriptedDispatcher::new(vec![
            Err(LocatorError::StaleElement("node-7".into())),
            Ok(Some(target())),
        ]);
        let resolved = run(dispatcher.clone(), options(5_000, false))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_until_the_deadline_is_not_found() {
        let dispatcher =
            ScriptedDispatcher::new(vec![Err(LocatorError::StaleElement("node-7".into()))]);
        let result = run(dispatcher, options(500, false)).await;
        assert!(matches!(result, Err(LocatorError::ElementNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_are_not_retried() {
        for error in [
            LocatorError::InvalidSelector("bad".into()),
            LocatorError::StaleScope("node-1".into()),
            LocatorError::Tree("dump failed".into()),
        ] {
            let dispatcher = ScriptedDispatcher::new(vec![Err(error.clone())]);
            let result = run(dispatcher.clone(), options(5_000, true)).await;
            assert_eq!(result, Err(error));
            assert_eq!(dispatcher.call_count(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_locators_never_reach_the_dispatcher() {
        let dispatcher = ScriptedDispatcher::misses_then_match(0);
        let result = PollingResolver::new(dispatcher.clone())
            .resolve(
                &Locator::ByLabel(String::new()),
                None,
                &FindOptions::default(),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(LocatorError::InvalidSelector(_))));
        assert_eq!(dispatcher.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_surfaces_as_interrupted() {
        let dispatcher = ScriptedDispatcher::new(vec![Ok(None)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            trigger.cancel();
        });

        let result = PollingResolver::new(dispatcher.clone())
            .resolve(&login(), None, &FindOptions::default(), &cancel)
            .await;
        assert!(matches!(result, Err(LocatorError::Interrupted(_))));
        assert_eq!(dispatcher.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scope_is_kept_on_the_result() {
        let scope = NodeHandle::new(NodeId(5));
        let dispatcher = ScriptedDispatcher::misses_then_match(0);
        let resolved = PollingResolver::new(dispatcher)
            .resolve(
                &login(),
                Some(scope),
                &FindOptions::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.scope, Some(scope));
    }
}
