//! Local collaborators
//!
//! Stand-ins for the on-device input injector and server lifecycle, used when
//! the engine runs against a fixture tree from the CLI.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use command_handlers::{
    CommandResult, CommandRouter, CommandRouterBuilder, DevicePort, LifecyclePort,
};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;
use ui_tree::{SnapshotTree, TreeError};

use crate::config::Config;

/// Router wired to a fixture tree and the local collaborators.
pub struct LocalRuntime {
    pub tree: Arc<SnapshotTree>,
    pub device: Arc<LocalDevice>,
    pub lifecycle: Arc<LocalLifecycle>,
    pub router: Arc<CommandRouter>,
}

impl LocalRuntime {
    pub fn new(tree: Arc<SnapshotTree>, config: &Config) -> Self {
        let device = Arc::new(LocalDevice::new(tree.clone()));
        let lifecycle = Arc::new(LocalLifecycle::new());
        let router = CommandRouterBuilder::new(tree.clone(), device.clone(), lifecycle.clone())
            .with_settings(config.handler_settings())
            .build();
        Self {
            tree,
            device,
            lifecycle,
            router: Arc::new(router),
        }
    }

    pub async fn load(path: impl AsRef<Path>, config: &Config) -> Result<Self, TreeError> {
        let path = path.as_ref();
        let tree = SnapshotTree::load(path).await?;
        info!(path = %path.display(), "loaded accessibility tree fixture");
        Ok(Self::new(Arc::new(tree), config))
    }
}

/// Records taps instead of injecting them and reports the fixture's package.
pub struct LocalDevice {
    tree: Arc<SnapshotTree>,
    taps: Mutex<Vec<(i32, i32)>>,
}

impl LocalDevice {
    pub fn new(tree: Arc<SnapshotTree>) -> Self {
        Self {
            tree,
            taps: Mutex::new(Vec::new()),
        }
    }

    pub fn taps(&self) -> Vec<(i32, i32)> {
        self.taps.lock().clone()
    }
}

#[async_trait]
impl DevicePort for LocalDevice {
    async fn tap(&self, x: i32, y: i32) -> CommandResult<()> {
        info!(x, y, "tap");
        self.taps.lock().push((x, y));
        Ok(())
    }

    async fn current_package(&self) -> CommandResult<Option<String>> {
        let package = self.tree.root().package;
        Ok((!package.is_empty()).then_some(package))
    }
}

/// Lifecycle backed by cancellation tokens the transport listens on.
pub struct LocalLifecycle {
    listener: CancellationToken,
    server: CancellationToken,
    wake_until: Mutex<Option<Instant>>,
}

impl LocalLifecycle {
    pub fn new() -> Self {
        Self {
            listener: CancellationToken::new(),
            server: CancellationToken::new(),
            wake_until: Mutex::new(None),
        }
    }

    /// Cancelled once the command listener has been told to stop
    pub fn listener_token(&self) -> CancellationToken {
        self.listener.clone()
    }

    pub fn server_token(&self) -> CancellationToken {
        self.server.clone()
    }

    /// Instant the current wake lock lapses, if one was taken
    pub fn wake_lock_until(&self) -> Option<Instant> {
        *self.wake_until.lock()
    }
}

impl Default for LocalLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecyclePort for LocalLifecycle {
    async fn acquire_wake_lock(&self, duration: Duration) -> CommandResult<()> {
        info!(duration_ms = duration.as_millis() as u64, "wake lock acquired");
        *self.wake_until.lock() = Some(Instant::now() + duration);
        Ok(())
    }

    async fn stop_listener(&self) -> CommandResult<()> {
        info!("stopping command listener");
        self.listener.cancel();
        Ok(())
    }

    async fn stop_server(&self) -> CommandResult<()> {
        info!("stopping server");
        self.server.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ui_tree::UiNode;

    use super::*;

    #[tokio::test]
    async fn device_reports_the_fixture_package() {
        let tree = Arc::new(SnapshotTree::new(
            UiNode::new("android.widget.FrameLayout").with_package("com.example.shop"),
        ));
        let device = LocalDevice::new(tree.clone());
        assert_eq!(
            device.current_package().await.unwrap().as_deref(),
            Some("com.example.shop")
        );

        tree.replace_root(UiNode::new("android.widget.FrameLayout"));
        assert_eq!(device.current_package().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_signals_its_tokens() {
        let lifecycle = LocalLifecycle::new();
        let listener = lifecycle.listener_token();
        let server = lifecycle.server_token();

        lifecycle
            .acquire_wake_lock(Duration::from_millis(600_000))
            .await
            .unwrap();
        assert_eq!(
            lifecycle.wake_lock_until(),
            Some(Instant::now() + Duration::from_millis(600_000))
        );

        lifecycle.stop_listener().await.unwrap();
        assert!(listener.is_cancelled());
        assert!(!server.is_cancelled());
        lifecycle.stop_server().await.unwrap();
        assert!(server.is_cancelled());
    }
}
