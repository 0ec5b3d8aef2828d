mod cli;
mod commands;
mod graphql;

use cli::{Cli, Commands};
use commands::{districts_csv, import_realized, verify};

fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    match &cli.command {
        Commands::DistrictsCsv(args) => districts_csv::run(args),
        Commands::ImportRealized(args) => import_realized::run(args),
        Commands::Verify(args) => verify::run(args),
    }
}

fn main() -> anyhow::Result<()> {
    run()
}
