use clap::Parser;
use ctlrouter::cli::{run_cli, Cli};
use ctlrouter::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging_with_config(&LogConfig::from_env())?;
    run_cli(cli)
}
