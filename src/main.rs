use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    livetrack_export::cli::run().await
}
