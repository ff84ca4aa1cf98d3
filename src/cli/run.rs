use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use command_handlers::CommandCtx;
use serde_json::Value;
use tracing::info;
use uia_core_types::SessionId;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Accessibility tree fixture (JSON)
    #[arg(long, value_name = "FILE")]
    pub tree: Option<PathBuf>,

    /// Command name (find, click, wake, stop)
    #[arg(long)]
    pub command: String,

    /// JSON payload for the command
    #[arg(long, default_value = "{}")]
    pub payload: String,

    /// Session id echoed in the response
    #[arg(long)]
    pub session: Option<String>,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let payload: Value =
        serde_json::from_str(&args.payload).context("--payload must be valid JSON")?;
    let runtime = ctx.local_runtime(args.tree.as_ref()).await?;

    let command_ctx = CommandCtx::new(args.session.map(SessionId));
    let response = runtime
        .router
        .dispatch(&args.command, command_ctx, payload)
        .await;
    info!(status = %response.status, "command finished");

    let taps = runtime.device.taps();
    if !taps.is_empty() {
        info!(?taps, "taps recorded by the local device");
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
