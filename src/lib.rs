//! uia-driver
//!
//! Local runtime around the element lookup engine: configuration, the
//! in-process device and lifecycle collaborators, the JSON-line transport and
//! the CLI.

pub mod cli;
pub mod config;
pub mod local;
pub mod transport;

pub use config::{Config, ConfigError};
pub use local::{LocalDevice, LocalLifecycle, LocalRuntime};
pub use transport::{LineRequest, LineTransport, ServeSummary, TransportError};
