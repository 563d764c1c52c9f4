//! WQE CLI - Command line tool for exploring water-quality sample data.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "wqe-cli",
    version,
    about = "Water-quality explorer: filter, aggregate, smooth and animate sample data"
)]
struct Cli {
    #[command(flatten)]
    source: wqe_cmd::SourceArgs,

    #[command(subcommand)]
    command: wqe_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("[WQE] cli: {:?}", cli.command);
    wqe_cmd::run(cli.source, cli.command).await
}
