pub mod bootstrap;
pub mod classify;
pub mod errors;
pub mod handlers;
pub mod model;
pub mod ports;
pub mod router;
pub mod trace;

pub use bootstrap::CommandRouterBuilder;
pub use classify::{classify, ErrorCategory, Failure};
pub use errors::{CommandError, CommandResult};
pub use handlers::{CommandCtx, CommandEnv, CommandHandler, HandlerSettings};
pub use model::{CommandResponse, FindElementModel};
pub use ports::{DevicePort, LifecyclePort};
pub use router::CommandRouter;
