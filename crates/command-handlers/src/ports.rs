use std::time::Duration;

use async_trait::async_trait;

use crate::errors::CommandResult;

/// Input injection and device queries
#[async_trait]
pub trait DevicePort: Send + Sync {
    /// Single tap at screen coordinates
    async fn tap(&self, x: i32, y: i32) -> CommandResult<()>;

    /// Package of the foreground application, when the device can tell
    async fn current_package(&self) -> CommandResult<Option<String>>;
}

/// Process lifecycle collaborators
#[async_trait]
pub trait LifecyclePort: Send + Sync {
    /// Keep the screen on for `duration`; returns once the lock is held
    async fn acquire_wake_lock(&self, duration: Duration) -> CommandResult<()>;

    /// Stop the notification listener
    async fn stop_listener(&self) -> CommandResult<()>;

    /// Stop the server instrumentation
    async fn stop_server(&self) -> CommandResult<()>;
}
