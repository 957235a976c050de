#[tokio::main]
async fn main() -> anyhow::Result<()> {
    winter::start_server().await
}
