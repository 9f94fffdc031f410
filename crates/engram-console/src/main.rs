use engram_console::{cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    run(&matches).await
}
