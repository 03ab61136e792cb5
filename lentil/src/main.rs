use anyhow::Result;
use clap::Parser;
use lentil::cli::{fit, simulate, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match &cli.command {
        Commands::Fit(args) => {
            fit::run(args, cli.verbose)?;
        }
        Commands::Simulate(args) => {
            simulate::run(args)?;
        }
    }

    Ok(())
}
