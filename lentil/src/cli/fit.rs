use crate::common_io::{mkdir, output_path};
use crate::inference::{Estimator, MeanFieldVI, PosteriorSummary, TrainConfig};
use crate::sgvb::{exact_posterior, GaussianNoise};
use crate::toy_data::{build_toy_dataset, Dataset};

use anyhow::Result;
use candle_core::Device;
use clap::Args;
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct FitArgs {
    #[arg(
        long,
        help = "Data file (header line, features then response)",
        long_help = "Data file with a header line and the response in the last column.\n\
		     `.csv` is comma-separated, anything else tab-separated; `.gz` is fine.\n\
		     Without it the toy data are generated."
    )]
    pub data: Option<String>,

    #[arg(short, long, default_value_t = 40, help = "Number of toy data points (even)")]
    pub n: usize,

    #[arg(long, default_value_t = 0.1, help = "Noise standard deviation of the toy data")]
    pub noise_std: f32,

    #[arg(long, default_value_t = 42, help = "Random seed")]
    pub seed: u64,

    #[arg(long, default_value_t = 501)]
    pub iters: usize,

    #[arg(long, default_value_t = 0.1, help = "Initial learning rate")]
    pub lr: f32,

    #[arg(long, default_value_t = 0.9, help = "Learning rate decay per stair")]
    pub decay_rate: f32,

    #[arg(long, default_value_t = 100, help = "Iterations per stair (0: no decay)")]
    pub decay_steps: usize,

    #[arg(
        long,
        help = "Monte Carlo samples per step",
        long_help = "Monte Carlo samples per step.\n\
		     Defaults to 1, or 10 for the score-function estimator,\n\
		     whose control variate needs at least 2."
    )]
    pub samples: Option<usize>,

    #[arg(short, long, value_enum, default_value = "analytic-kl")]
    pub estimator: Estimator,

    #[arg(long, default_value_t = 1, help = "Report every this many iterations")]
    pub print_every: usize,

    #[arg(long, default_value_t = 1.0, help = "Prior scale τ of β ~ N(0, τ²)")]
    pub prior_scale: f32,

    #[arg(long, default_value_t = 1.0, help = "Likelihood scale σ of y ~ N(Xβ, σ²)")]
    pub lik_std: f32,

    #[arg(
        short,
        long,
        help = "Output prefix (creates {output}.posterior.json and {output}.trace.tsv)"
    )]
    pub output: Option<String>,

    #[arg(long)]
    pub gpu: bool,
}

const DEFAULT_SAMPLES: usize = 1;
const DEFAULT_SCORE_FUNCTION_SAMPLES: usize = 10;

/// Monte Carlo draws behind the ELBO in the summary
const SUMMARY_ELBO_SAMPLES: usize = 1000;

/// Everything a fit reports
#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub estimator: String,
    pub samples: usize,
    pub iterations: usize,
    pub final_loss: Option<f32>,
    pub elbo: f32,
    pub rmse: f32,
    pub variational: PosteriorSummary,
    pub exact: PosteriorSummary,
}

fn exact_summary(data: &Dataset, prior_scale: f32, lik_std: f32) -> Result<PosteriorSummary> {
    let (n, p) = data.x.dim();
    let x = DMatrix::from_row_iterator(n, p, data.x.iter().map(|&v| v as f64));
    let y = DVector::from_iterator(n, data.y.iter().map(|&v| v as f64));

    let post = exact_posterior(&x, &y, prior_scale as f64, lik_std as f64)?;
    Ok(PosteriorSummary {
        mean: post.mean.iter().map(|&v| v as f32).collect(),
        std: post.std().iter().map(|&v| v as f32).collect(),
    })
}

/// Fit q(β) and compare it with the exact posterior
pub fn fit(args: &FitArgs, verbose: bool) -> Result<FitSummary> {
    let device = if args.gpu {
        #[cfg(target_os = "macos")]
        {
            Device::new_metal(0).unwrap_or(Device::Cpu)
        }
        #[cfg(not(target_os = "macos"))]
        {
            Device::new_cuda(0).unwrap_or(Device::Cpu)
        }
    } else {
        Device::Cpu
    };
    info!("Using device: {:?}", device);

    let data = match &args.data {
        Some(file) => Dataset::from_file(file)?,
        None => {
            info!(
                "toy data: n = {}, noise_std = {}, seed = {}",
                args.n, args.noise_std, args.seed
            );
            build_toy_dataset(args.n, args.noise_std, args.seed)?
        }
    };
    let (x, y) = data.to_tensors(&device)?;
    info!("  X shape: {:?}, y shape: {:?}", x.dims(), y.dims());

    let num_samples = args.samples.unwrap_or(match args.estimator {
        Estimator::ScoreFunction => DEFAULT_SCORE_FUNCTION_SAMPLES,
        _ => DEFAULT_SAMPLES,
    });

    let config = TrainConfig {
        num_iters: args.iters,
        learning_rate: args.lr,
        decay_rate: args.decay_rate,
        decay_steps: args.decay_steps,
        num_samples,
        estimator: args.estimator,
        print_every: args.print_every,
        prior_scale: args.prior_scale,
        noise_std: args.lik_std,
        seed: args.seed,
        verbose,
        show_progress: true,
    };

    let noise = GaussianNoise::new(config.seed);
    let mut vi = MeanFieldVI::new(x, y, config, &noise)?;
    let trace = vi.run()?;

    let summary = FitSummary {
        estimator: args.estimator.to_string(),
        samples: num_samples,
        iterations: trace.losses.len(),
        final_loss: trace.last(),
        elbo: vi.elbo(SUMMARY_ELBO_SAMPLES)?,
        rmse: vi.rmse()?,
        variational: vi.posterior()?,
        exact: exact_summary(&data, args.prior_scale, args.lik_std)?,
    };

    if let Some(prefix) = &args.output {
        let json_file = output_path(prefix, "posterior.json");
        mkdir(&json_file)?;
        std::fs::write(&json_file, serde_json::to_string_pretty(&summary)?)?;
        info!("Saved posterior summary to {}", json_file);

        let trace_file = output_path(prefix, "trace.tsv");
        trace.to_file(&trace_file)?;
        info!("Saved loss trace to {}", trace_file);
    }

    Ok(summary)
}

pub fn run(args: &FitArgs, verbose: bool) -> Result<()> {
    let summary = fit(args, verbose)?;

    println!(
        "{} ({} samples) after {} iterations, loss = {:.4}, elbo = {:.4}, rmse = {:.4}",
        summary.estimator,
        summary.samples,
        summary.iterations,
        summary.final_loss.unwrap_or(f32::NAN),
        summary.elbo,
        summary.rmse
    );
    for (j, ((m, s), (em, es))) in summary
        .variational
        .mean
        .iter()
        .zip(summary.variational.std.iter())
        .zip(summary.exact.mean.iter().zip(summary.exact.std.iter()))
        .enumerate()
    {
        println!(
            "beta[{}]: q mean = {:.4}, q std = {:.4} | exact mean = {:.4}, exact std = {:.4}",
            j, m, s, em, es
        );
    }
    Ok(())
}
