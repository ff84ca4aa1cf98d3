use anyhow::Result;

use super::env::CliArgs;
use super::info::cmd_info;
use super::run::cmd_run;
use super::serve::cmd_serve;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Serve(args) => cmd_serve(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
