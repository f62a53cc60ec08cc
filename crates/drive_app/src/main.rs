mod cli;
mod platform;

use clap::Parser;

use crate::cli::Cli;
use crate::platform::{commands, logging};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log.into());
    commands::run(cli)
}
