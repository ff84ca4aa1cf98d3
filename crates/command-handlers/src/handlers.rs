//! Command handlers
//!
//! Each handler is `parse -> resolve -> act -> serialize`. Handlers return
//! raw [`CommandError`]s; classification is left to the router.

use std::sync::Arc;
use std::time::Duration;

use action_locator::{
    parse_locator, LocatorStrategy, PollingResolver, ResolvedElement, DEFAULT_TIMEOUT_MS,
};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use ui_tree::{AccessibilityTree, ElementInfo};
use uia_core_types::SessionId;

use crate::errors::{CommandError, CommandResult};
use crate::model::FindElementModel;
use crate::ports::{DevicePort, LifecyclePort};

pub const FIND: &str = "find";
pub const CLICK: &str = "click";
pub const WAKE: &str = "wake";
pub const STOP: &str = "stop";

/// How long `wake` keeps the screen on.
pub const WAKE_LOCK_DURATION: Duration = Duration::from_millis(600_000);

/// Handler-visible settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSettings {
    pub default_timeout_ms: u64,
    /// Used for id rewriting when the device reports no foreground package
    pub app_package: Option<String>,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            app_package: None,
        }
    }
}

/// Collaborators shared by every handler
#[derive(Clone)]
pub struct CommandEnv {
    pub tree: Arc<dyn AccessibilityTree>,
    pub resolver: PollingResolver,
    pub device: Arc<dyn DevicePort>,
    pub lifecycle: Arc<dyn LifecyclePort>,
    pub settings: HandlerSettings,
}

/// Per-command context
#[derive(Clone, Debug, Default)]
pub struct CommandCtx {
    pub session_id: Option<SessionId>,
    pub cancel: CancellationToken,
}

impl CommandCtx {
    pub fn new(session_id: Option<SessionId>) -> Self {
        Self {
            session_id,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, env: &CommandEnv, ctx: &CommandCtx, payload: Value)
        -> CommandResult<Value>;
}

async fn target_package(env: &CommandEnv) -> CommandResult<Option<String>> {
    let reported = env.device.current_package().await?;
    Ok(reported
        .filter(|pkg| !pkg.trim().is_empty())
        .or_else(|| env.settings.app_package.clone()))
}

async fn resolve_element(
    env: &CommandEnv,
    ctx: &CommandCtx,
    model: &FindElementModel,
) -> CommandResult<Option<ResolvedElement>> {
    let package = if model.strategy == LocatorStrategy::Id.name() {
        target_package(env).await?
    } else {
        None
    };
    let locator = parse_locator(&model.strategy, &model.selector, package.as_deref())?;
    let scope = model.scope()?;
    let options = model.find_options(env.settings.default_timeout_ms);

    Ok(env
        .resolver
        .resolve(&locator, scope, &options, &ctx.cancel)
        .await?)
}

fn element_value(info: &ElementInfo) -> CommandResult<Value> {
    serde_json::to_value(info).map_err(|err| CommandError::Internal(err.to_string()))
}

pub struct FindElement;

#[async_trait]
impl CommandHandler for FindElement {
    fn name(&self) -> &'static str {
        FIND
    }

    async fn handle(
        &self,
        env: &CommandEnv,
        ctx: &CommandCtx,
        payload: Value,
    ) -> CommandResult<Value> {
        let model = FindElementModel::from_payload(&payload)?;
        let Some(resolved) = resolve_element(env, ctx, &model).await? else {
            return Ok(Value::Null);
        };
        let info = env.tree.element_info(&resolved.handle).await?;
        debug!(element = %info.element_id, attempts = resolved.attempts, "element found");
        element_value(&info)
    }
}

pub struct ClickElement;

#[async_trait]
impl CommandHandler for ClickElement {
    fn name(&self) -> &'static str {
        CLICK
    }

    async fn handle(
        &self,
        env: &CommandEnv,
        ctx: &CommandCtx,
        payload: Value,
    ) -> CommandResult<Value> {
        let model = FindElementModel::from_payload(&payload)?;
        let Some(resolved) = resolve_element(env, ctx, &model).await? else {
            info!("click target absent, nothing tapped");
            return Ok(Value::Null);
        };

        // re-read at click time; a redraw since resolution makes this stale
        let info = env.tree.element_info(&resolved.handle).await?;
        let (x, y) = info.bounds.center();
        env.device.tap(x, y).await?;
        info!(element = %info.element_id, x, y, "tapped element");
        element_value(&info)
    }
}

pub struct WakeUp;

#[async_trait]
impl CommandHandler for WakeUp {
    fn name(&self) -> &'static str {
        WAKE
    }

    async fn handle(
        &self,
        env: &CommandEnv,
        _ctx: &CommandCtx,
        _payload: Value,
    ) -> CommandResult<Value> {
        env.lifecycle.acquire_wake_lock(WAKE_LOCK_DURATION).await?;
        info!(duration_ms = WAKE_LOCK_DURATION.as_millis() as u64, "wake lock acquired");
        Ok(Value::String(String::new()))
    }
}

pub struct StopServer;

#[async_trait]
impl CommandHandler for StopServer {
    fn name(&self) -> &'static str {
        STOP
    }

    async fn handle(
        &self,
        env: &CommandEnv,
        _ctx: &CommandCtx,
        _payload: Value,
    ) -> CommandResult<Value> {
        env.lifecycle.stop_listener().await?;
        env.lifecycle.stop_server().await?;
        info!("server stop requested");
        Ok(Value::String(String::new()))
    }
}

/// The standard handler set
pub fn default_handlers() -> Vec<Arc<dyn CommandHandler>> {
    vec![
        Arc::new(FindElement),
        Arc::new(ClickElement),
        Arc::new(WakeUp),
        Arc::new(StopServer),
    ]
}
