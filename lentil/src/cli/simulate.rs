use crate::toy_data::build_toy_dataset;

use anyhow::Result;
use clap::Args;
use log::info;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(short, long, default_value_t = 40, help = "Number of data points (even)")]
    pub n: usize,

    #[arg(long, default_value_t = 0.1, help = "Noise standard deviation")]
    pub noise_std: f32,

    #[arg(long, default_value_t = 42, help = "Random seed")]
    pub seed: u64,

    #[arg(
        short,
        long,
        help = "Output file (`.csv` comma-separated, otherwise tab-separated; `.gz` ok)",
        default_value = "stdout"
    )]
    pub output: String,
}

pub fn run(args: &SimulateArgs) -> Result<()> {
    info!(
        "simulating {} points, noise_std = {}, seed = {}",
        args.n, args.noise_std, args.seed
    );
    let data = build_toy_dataset(args.n, args.noise_std, args.seed)?;
    data.to_file(&args.output)
}
