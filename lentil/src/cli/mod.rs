pub mod fit;
pub mod simulate;

use clap::{Parser, Subcommand};

pub use fit::FitArgs;
pub use simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "lentil", version)]
#[command(about = "Bayesian linear regression by mean-field variational inference")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        help = "Verbose output",
        long_help = "Enable verbose output `RUST_LOG=info`"
    )]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit q(β) to the toy data (or a data file) and report progress
    Fit(FitArgs),
    /// Write the toy regression data to a file
    Simulate(SimulateArgs),
}
