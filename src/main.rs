use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    uia_driver::cli::run().await
}
