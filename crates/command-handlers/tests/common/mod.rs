#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use command_handlers::{
    CommandError, CommandResult, CommandRouter, CommandRouterBuilder, DevicePort,
    HandlerSettings, LifecyclePort,
};
use parking_lot::Mutex;
use ui_tree::{AccessibilityTree, ElementInfo, NodeHandle, SnapshotTree, TreeError, UiNode};
use uia_core_types::Bounds;

pub const PACKAGE: &str = "com.example.shop";

pub fn login_screen() -> UiNode {
    UiNode::new("android.widget.FrameLayout")
        .with_package(PACKAGE)
        .with_bounds(Bounds::new(0, 0, 1080, 2280))
        .with_child(
            UiNode::new("android.widget.LinearLayout")
                .with_resource_id("com.example.shop:id/form")
                .with_package(PACKAGE)
                .with_bounds(Bounds::new(0, 200, 1080, 1200))
                .with_child(
                    UiNode::new("android.widget.EditText")
                        .with_resource_id("com.example.shop:id/username")
                        .with_package(PACKAGE)
                        .with_bounds(Bounds::new(40, 240, 1040, 360)),
                )
                .with_child(
                    UiNode::new("android.widget.Button")
                        .with_resource_id("com.example.shop:id/login_button")
                        .with_content_desc("Log in")
                        .with_text("Sign in")
                        .with_package(PACKAGE)
                        .with_bounds(Bounds::new(40, 1000, 1040, 1160)),
                ),
        )
        .with_child(
            UiNode::new("android.widget.Button")
                .with_resource_id("com.example.shop:id/help")
                .with_text("Help")
                .with_package(PACKAGE)
                .with_bounds(Bounds::new(0, 2100, 200, 2280)),
        )
}

#[derive(Default)]
pub struct FakeDevice {
    pub package: Mutex<Option<String>>,
    pub taps: Mutex<Vec<(i32, i32)>>,
    pub fail_taps: Mutex<bool>,
}

impl FakeDevice {
    pub fn with_package(package: &str) -> Arc<Self> {
        let device = Self::default();
        *device.package.lock() = Some(package.to_string());
        Arc::new(device)
    }

    pub fn taps(&self) -> Vec<(i32, i32)> {
        self.taps.lock().clone()
    }
}

#[async_trait]
impl DevicePort for FakeDevice {
    async fn tap(&self, x: i32, y: i32) -> CommandResult<()> {
        if *self.fail_taps.lock() {
            return Err(CommandError::device("input injection refused"));
        }
        self.taps.lock().push((x, y));
        Ok(())
    }

    async fn current_package(&self) -> CommandResult<Option<String>> {
        Ok(self.package.lock().clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCall {
    WakeLock(Duration),
    StopListener,
    StopServer,
}

#[derive(Default)]
pub struct FakeLifecycle {
    pub calls: Mutex<Vec<LifecycleCall>>,
}

impl FakeLifecycle {
    pub fn calls(&self) -> Vec<LifecycleCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LifecyclePort for FakeLifecycle {
    async fn acquire_wake_lock(&self, duration: Duration) -> CommandResult<()> {
        self.calls.lock().push(LifecycleCall::WakeLock(duration));
        Ok(())
    }

    async fn stop_listener(&self) -> CommandResult<()> {
        self.calls.lock().push(LifecycleCall::StopListener);
        Ok(())
    }

    async fn stop_server(&self) -> CommandResult<()> {
        self.calls.lock().push(LifecycleCall::StopServer);
        Ok(())
    }
}

/// Tree whose content is redrawn right before any element read, so a handle
/// resolved a moment earlier is stale by the time it is used.
pub struct RedrawBeforeRead {
    pub inner: Arc<SnapshotTree>,
}

#[async_trait]
impl AccessibilityTree for RedrawBeforeRead {
    async fn refresh(&self) -> Result<(), TreeError> {
        self.inner.refresh().await
    }

    async fn snapshot(&self, scope: Option<&NodeHandle>) -> Result<UiNode, TreeError> {
        self.inner.snapshot(scope).await
    }

    async fn element_info(&self, handle: &NodeHandle) -> Result<ElementInfo, TreeError> {
        self.inner.replace_root(login_screen());
        self.inner.element_info(handle).await
    }
}

pub struct Harness {
    pub tree: Arc<SnapshotTree>,
    pub device: Arc<FakeDevice>,
    pub lifecycle: Arc<FakeLifecycle>,
    pub router: CommandRouter,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_tree(Arc::new(SnapshotTree::new(login_screen())))
    }

    pub fn with_tree(tree: Arc<SnapshotTree>) -> Self {
        let device = FakeDevice::with_package(PACKAGE);
        let lifecycle = Arc::new(FakeLifecycle::default());
        let router = CommandRouterBuilder::new(tree.clone(), device.clone(), lifecycle.clone())
            .with_settings(HandlerSettings::default())
            .build();
        Self {
            tree,
            device,
            lifecycle,
            router,
        }
    }

    pub fn redrawing_before_reads() -> Self {
        let tree = Arc::new(SnapshotTree::new(login_screen()));
        let device = FakeDevice::with_package(PACKAGE);
        let lifecycle = Arc::new(FakeLifecycle::default());
        let redrawing = Arc::new(RedrawBeforeRead {
            inner: tree.clone(),
        });
        let router = CommandRouterBuilder::new(redrawing, device.clone(), lifecycle.clone()).build();
        Self {
            tree,
            device,
            lifecycle,
            router,
        }
    }
}
