use std::sync::Arc;

use action_locator::{
    PollingResolver, QueryDispatcher, QueryLanguageEvaluator, TreeQueryDispatcher,
};
use ui_tree::AccessibilityTree;

use crate::handlers::{default_handlers, CommandEnv, CommandHandler, HandlerSettings};
use crate::ports::{DevicePort, LifecyclePort};
use crate::router::CommandRouter;
use crate::trace::CommandTracer;

/// Wires the tree, lookup pipeline and device collaborators into a router.
pub struct CommandRouterBuilder {
    tree: Arc<dyn AccessibilityTree>,
    device: Arc<dyn DevicePort>,
    lifecycle: Arc<dyn LifecyclePort>,
    settings: HandlerSettings,
    dispatcher: Option<Arc<dyn QueryDispatcher>>,
    query_language: Option<Arc<dyn QueryLanguageEvaluator>>,
    tracer: CommandTracer,
    handlers: Vec<Arc<dyn CommandHandler>>,
}

impl CommandRouterBuilder {
    pub fn new(
        tree: Arc<dyn AccessibilityTree>,
        device: Arc<dyn DevicePort>,
        lifecycle: Arc<dyn LifecyclePort>,
    ) -> Self {
        Self {
            tree,
            device,
            lifecycle,
            settings: HandlerSettings::default(),
            dispatcher: None,
            query_language: None,
            tracer: CommandTracer,
            handlers: default_handlers(),
        }
    }

    pub fn with_settings(mut self, settings: HandlerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the tree-backed dispatcher altogether
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn QueryDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_query_language(mut self, evaluator: Arc<dyn QueryLanguageEvaluator>) -> Self {
        self.query_language = Some(evaluator);
        self
    }

    pub fn with_tracer(mut self, tracer: CommandTracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Register a handler; replaces any handler with the same name
    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handlers.retain(|existing| existing.name() != handler.name());
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> CommandRouter {
        let dispatcher = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => {
                let mut dispatcher = TreeQueryDispatcher::new(self.tree.clone());
                if let Some(evaluator) = self.query_language {
                    dispatcher = dispatcher.with_query_language(evaluator);
                }
                Arc::new(dispatcher)
            }
        };

        let env = CommandEnv {
            tree: self.tree,
            resolver: PollingResolver::new(dispatcher),
            device: self.device,
            lifecycle: self.lifecycle,
            settings: self.settings,
        };
        CommandRouter::new(env, self.handlers, self.tracer)
    }
}
