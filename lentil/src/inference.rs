use crate::common_io::write_lines;
use crate::sgvb::{
    compute_elbo, direct_elbo_loss, kl_elbo_loss, sgvb_loss, FixedGaussianLikelihood,
    FixedGaussianPrior, GaussianNoise, LinearRegressionSGVB, SGVBConfig,
};

use candle_core::Tensor;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use serde::Serialize;

/// Which Monte Carlo estimate of the ELBO gradient to follow
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Estimator {
    /// Reparameterized likelihood term with the KL in closed form
    AnalyticKl,
    /// Reparameterized likelihood, prior and entropy terms
    Reparam,
    /// Score function (REINFORCE) surrogate
    ScoreFunction,
}

impl std::fmt::Display for Estimator {
    /// Same spelling as the `--estimator` flag
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(v) => write!(f, "{}", v.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

/// The score function needs this many samples for its control variate
pub const MIN_SCORE_FUNCTION_SAMPLES: usize = 2;

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub num_iters: usize,
    pub learning_rate: f32,
    pub decay_rate: f32,
    pub decay_steps: usize,
    pub num_samples: usize,
    pub estimator: Estimator,
    pub print_every: usize,
    pub prior_scale: f32,
    pub noise_std: f32,
    pub seed: u64,
    pub verbose: bool,
    pub show_progress: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            num_iters: 501,
            learning_rate: 0.1,
            decay_rate: 0.9,
            decay_steps: 100,
            num_samples: 1,
            estimator: Estimator::AnalyticKl,
            print_every: 1,
            prior_scale: 1.0,
            noise_std: 1.0,
            seed: 42,
            verbose: false,
            show_progress: false,
        }
    }
}

/// Staircase exponential decay: lr(t) = lr0 * rate^floor(t / steps)
#[derive(Debug, Clone, Copy)]
pub struct LearningRateSchedule {
    pub initial: f64,
    pub decay_rate: f64,
    pub decay_steps: usize,
}

impl LearningRateSchedule {
    pub fn learning_rate(&self, step: usize) -> f64 {
        if self.decay_steps == 0 {
            return self.initial;
        }
        let stairs = (step / self.decay_steps) as i32;
        self.initial * self.decay_rate.powi(stairs)
    }
}

impl From<&TrainConfig> for LearningRateSchedule {
    fn from(config: &TrainConfig) -> Self {
        Self {
            initial: config.learning_rate as f64,
            decay_rate: config.decay_rate as f64,
            decay_steps: config.decay_steps,
        }
    }
}

/// Marginal mean and standard deviation per coefficient
#[derive(Debug, Clone, Serialize)]
pub struct PosteriorSummary {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

/// Loss value of every iteration
#[derive(Debug, Clone, Default)]
pub struct TrainTrace {
    pub losses: Vec<f32>,
}

impl TrainTrace {
    pub fn last(&self) -> Option<f32> {
        self.losses.last().copied()
    }

    /// Write `iter<TAB>loss` lines with a header
    pub fn to_file(&self, file: &str) -> anyhow::Result<()> {
        let mut lines = vec!["iter\tloss".to_string()];
        lines.extend(
            self.losses
                .iter()
                .enumerate()
                .map(|(t, l)| format!("{}\t{}", t, l)),
        );
        write_lines(&lines, file)
    }
}

/// Mean-field variational inference for
///
/// ```text
/// β ~ N(0, τ²),   y ~ N(X β, σ²),   q(β) = N(μ, softplus(ρ)²)
/// ```
///
/// Drive it like `initialize`, then repeatedly `train` and
/// `print_progress`, or just `run`.
pub struct MeanFieldVI<'a> {
    model: LinearRegressionSGVB<'a, FixedGaussianPrior>,
    likelihood: FixedGaussianLikelihood,
    config: TrainConfig,
    schedule: LearningRateSchedule,
    optimizer: Option<AdamW>,
    progress: Option<ProgressBar>,
    step: usize,
    loss: Option<f32>,
}

impl<'a> MeanFieldVI<'a> {
    /// * `x` - design matrix (n, p)
    /// * `y` - response (n, 1)
    /// * `config` - training configuration
    /// * `noise` - seeded noise for initial values and ε
    pub fn new(
        x: Tensor,
        y: Tensor,
        config: TrainConfig,
        noise: &'a GaussianNoise,
    ) -> anyhow::Result<Self> {
        let (n, _p) = x.dims2()?;
        let (ny, k) = y.dims2()?;
        anyhow::ensure!(n == ny, "X has {} rows but y has {}", n, ny);
        anyhow::ensure!(config.num_samples > 0, "need at least one Monte Carlo sample");
        anyhow::ensure!(
            config.estimator != Estimator::ScoreFunction
                || config.num_samples >= MIN_SCORE_FUNCTION_SAMPLES,
            "{} needs at least {} samples per step, got {}",
            config.estimator,
            MIN_SCORE_FUNCTION_SAMPLES,
            config.num_samples
        );
        anyhow::ensure!(
            config.prior_scale > 0.0 && config.noise_std > 0.0,
            "prior and noise scales must be positive"
        );

        let prior = FixedGaussianPrior::new(0.0, config.prior_scale);
        let sgvb_config = SGVBConfig::new(config.num_samples);
        let model = LinearRegressionSGVB::new(x, k, prior, sgvb_config, noise)?;

        let variance = (config.noise_std as f64).powi(2);
        let likelihood = FixedGaussianLikelihood::new(y, variance);

        let schedule = LearningRateSchedule::from(&config);

        Ok(Self {
            model,
            likelihood,
            config,
            schedule,
            optimizer: None,
            progress: None,
            step: 0,
            loss: None,
        })
    }

    /// Set up ADAM over q's variables and reset the step counter
    pub fn initialize(&mut self) -> anyhow::Result<()> {
        let params = ParamsAdamW {
            lr: self.schedule.learning_rate(0),
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        };
        self.optimizer = Some(AdamW::new(self.model.vars(), params)?);

        let pb = ProgressBar::new(self.config.num_iters as u64).with_style(
            ProgressStyle::with_template("Optimizing {bar:40} {pos}/{len} iterations {msg}")?
                .progress_chars("##-"),
        );
        if !self.config.show_progress || self.config.verbose {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        self.progress = Some(pb);

        self.step = 0;
        self.loss = None;
        info!(
            "initialized {} with {} sample(s), lr = {}",
            self.config.estimator,
            self.config.num_samples,
            self.schedule.learning_rate(0)
        );
        Ok(())
    }

    /// One optimization step; returns the loss it minimized
    pub fn train(&mut self) -> anyhow::Result<f32> {
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or(anyhow::anyhow!("call initialize() before train()"))?;

        optimizer.set_learning_rate(self.schedule.learning_rate(self.step));

        let num_samples = self.config.num_samples;
        let loss = match self.config.estimator {
            Estimator::AnalyticKl => kl_elbo_loss(&self.model, &self.likelihood, num_samples)?,
            Estimator::Reparam => direct_elbo_loss(&self.model, &self.likelihood, num_samples)?,
            Estimator::ScoreFunction => sgvb_loss(&self.model, &self.likelihood, &self.model.config)?,
        };

        optimizer.backward_step(&loss)?;

        let loss_val = loss.to_scalar::<f32>()?;
        self.step += 1;
        self.loss = Some(loss_val);
        Ok(loss_val)
    }

    /// Loss of the latest step
    pub fn loss(&self) -> Option<f32> {
        self.loss
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Report iteration `t` every `print_every` iterations.
    ///
    /// The line goes to the log with `verbose`, otherwise into the
    /// progress bar message, or to stderr when the bar cannot draw.
    pub fn print_progress(&self, t: usize, loss: f32) -> anyhow::Result<()> {
        if let Some(pb) = &self.progress {
            pb.inc(1);
            pb.set_message(format!("loss = {:.4}", loss));
        }
        if self.config.print_every == 0 || t % self.config.print_every != 0 {
            return Ok(());
        }

        let line = self.progress_line(t, loss)?;
        let bar_hidden = self.progress.as_ref().is_none_or(|pb| pb.is_hidden());
        if self.config.verbose || !self.config.show_progress {
            info!("{}", line);
        } else if bar_hidden {
            eprintln!("{}", line);
        }
        Ok(())
    }

    fn progress_line(&self, t: usize, loss: f32) -> anyhow::Result<String> {
        let post = self.posterior()?;
        Ok(format!(
            "iter {:4}: loss = {:10.4}, q(β) mean = {:?}, std = {:?}",
            t, loss, post.mean, post.std
        ))
    }

    /// `initialize`, then `num_iters` rounds of `train` and `print_progress`
    pub fn run(&mut self) -> anyhow::Result<TrainTrace> {
        self.initialize()?;
        info!("{:?}", self.config);
        info!("Training for {} iterations", self.config.num_iters);

        let mut trace = TrainTrace::default();
        for t in 0..self.config.num_iters {
            let loss = self.train()?;
            anyhow::ensure!(loss.is_finite(), "loss diverged at iteration {}: {}", t, loss);
            self.print_progress(t, loss)?;
            trace.losses.push(loss);
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        Ok(trace)
    }

    /// Current q(β) marginals
    pub fn posterior(&self) -> anyhow::Result<PosteriorSummary> {
        let mean: Vec<f32> = self.model.coef_mean()?.flatten_all()?.to_vec1()?;
        let std: Vec<f32> = self.model.coef_std()?.flatten_all()?.to_vec1()?;
        Ok(PosteriorSummary { mean, std })
    }

    /// Posterior mean prediction X μ, shape (n, 1)
    pub fn predict_mean(&self) -> anyhow::Result<Tensor> {
        Ok(self.model.eta_mean()?)
    }

    /// Monte Carlo ELBO of the current q(β) over `num_samples` draws
    pub fn elbo(&self, num_samples: usize) -> anyhow::Result<f32> {
        let elbo = compute_elbo(&self.model, &self.likelihood, num_samples)?;
        Ok(elbo.to_scalar::<f32>()?)
    }

    /// Root mean squared error of the posterior mean prediction
    pub fn rmse(&self) -> anyhow::Result<f32> {
        let resid = (self.predict_mean()? - self.likelihood.y())?;
        Ok(resid.sqr()?.mean_all()?.sqrt()?.to_scalar::<f32>()?)
    }
}
