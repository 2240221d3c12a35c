use anyhow::Result;
use headsup::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
