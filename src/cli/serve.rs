use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio::io::BufReader;
use tracing::info;

use crate::cli::context::CliContext;
use crate::transport::LineTransport;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Accessibility tree fixture (JSON)
    #[arg(long, value_name = "FILE")]
    pub tree: Option<PathBuf>,
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let runtime = ctx.local_runtime(args.tree.as_ref()).await?;
    let transport = LineTransport::new(runtime.router.clone(), runtime.lifecycle.listener_token());

    info!(commands = ?runtime.router.commands(), "serving JSON lines on stdin");
    let summary = transport
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    info!(
        received = summary.received,
        rejected = summary.rejected,
        server_stopped = runtime.lifecycle.server_token().is_cancelled(),
        "serve finished"
    );
    Ok(())
}
