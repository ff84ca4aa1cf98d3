//! Command router
//!
//! Runs every command on its own task and classifies whatever goes wrong,
//! panics included, into a single failure response.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn, Instrument};

use crate::classify::{classify, ErrorCategory};
use crate::errors::{CommandError, CommandResult};
use crate::handlers::{CommandCtx, CommandEnv, CommandHandler};
use crate::model::CommandResponse;
use crate::trace::CommandTracer;

pub struct CommandRouter {
    env: CommandEnv,
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
    tracer: CommandTracer,
}

impl CommandRouter {
    pub(crate) fn new(
        env: CommandEnv,
        handlers: Vec<Arc<dyn CommandHandler>>,
        tracer: CommandTracer,
    ) -> Self {
        let handlers = handlers
            .into_iter()
            .map(|handler| (handler.name(), handler))
            .collect();
        Self {
            env,
            handlers,
            tracer,
        }
    }

    pub fn handles(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Registered command names, sorted
    pub fn commands(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run `command` and turn its outcome into a response. Never fails.
    pub async fn dispatch(&self, command: &str, ctx: CommandCtx, payload: Value) -> CommandResponse {
        let session = ctx.session_id.clone();
        let span = self
            .tracer
            .span(command, session.as_ref().map(|id| id.0.as_str()));

        async move {
            match self.run(command, ctx, payload).await {
                Ok(value) => {
                    info!("command succeeded");
                    CommandResponse::ok(session.as_ref(), value)
                }
                Err(err) => {
                    let failure = classify(&err, Some(command));
                    if failure.category == ErrorCategory::Unexpected {
                        warn!(error = %err, "command failed unexpectedly");
                    } else {
                        info!(code = failure.category.code(), error = %err, "command failed");
                    }
                    CommandResponse::failed(session.as_ref(), &failure)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, command: &str, ctx: CommandCtx, payload: Value) -> CommandResult<Value> {
        let handler = self
            .handlers
            .get(command)
            .cloned()
            .ok_or_else(|| CommandError::UnknownCommand(command.to_string()))?;
        let env = self.env.clone();

        let task = tokio::spawn(
            async move { handler.handle(&env, &ctx, payload).await }.in_current_span(),
        );
        match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(CommandError::Panicked(panic_message(
                err.into_panic(),
            ))),
            Err(err) => Err(CommandError::Internal(format!(
                "command task did not complete: {err}"
            ))),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
