#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autofill_cli::run().await
}
