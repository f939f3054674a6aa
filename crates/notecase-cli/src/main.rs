use anyhow::Result;
use clap::Parser;
use tracing::debug;

use notecase_cli::{cli::Cli, commands, logging};
use notecase_storage::StorageFactory;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    logging::init(&config.logging)?;

    debug!(backend = %config.storage.backend, "Opening store");
    let daos = StorageFactory::from_config(&config.storage)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::execute(&daos, cli.command, &mut out)
}
