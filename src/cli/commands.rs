use clap::Subcommand;

use super::run::RunArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Execute a single command against a fixture tree
    Run(RunArgs),

    /// Serve JSON-line commands from stdin
    Serve(ServeArgs),

    /// Show build information and the effective configuration
    Info,
}
