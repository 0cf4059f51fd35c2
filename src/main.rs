use std::path::Path;

use anyhow::Result;
use clap::Parser;
use url_radar::cli::{commands, flags::Cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, Path::new(&cli.log_file))?;
    commands::run(cli).await
}
