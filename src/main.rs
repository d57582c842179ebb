use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tool_gate::cli::run_cli().await
}
