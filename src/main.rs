#![allow(clippy::module_name_repetitions, clippy::future_not_send)]

use clap::{Parser, Subcommand};
use eyre::Result;

use crate::logging::{init_color_eyre, init_logger};

mod check;
mod errors;
mod load;
mod logging;
mod opts;
mod records;

/// SwarmDB review loading tools.
#[derive(Parser)]
pub struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ensure the reviews schema exists and bulk-upsert reviews from a CSV file.
    Load(load::Args),
    /// Verify connectivity to the database.
    Check(check::Args),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_color_eyre()?;
    init_logger();
    drop(dotenvy::dotenv());

    let args = Args::parse();

    match args.cmd {
        Command::Load(args) => load::load(args).await?,
        Command::Check(args) => check::check(args).await?,
    }

    Ok(())
}
