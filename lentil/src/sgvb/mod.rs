//! Stochastic Gradient Variational Bayes (SGVB) for Bayesian linear regression.
//!
//! Fits a mean-field Gaussian `q(θ) = N(μ, softplus(ρ)²)` to the posterior of
//! the coefficients of `η = X θ`, maximizing a Monte Carlo ELBO.
//!
//! # Estimators
//!
//! - [`kl_elbo_loss`]: reparameterized likelihood term, closed-form KL
//! - [`direct_elbo_loss`]: reparameterized likelihood, prior and entropy terms
//! - [`sgvb_loss`]: score function (REINFORCE) with a normalized-reward control variate
//!
//! # Example
//!
//! ```ignore
//! use lentil::sgvb::*;
//!
//! let noise = GaussianNoise::new(42);
//! let model = LinearRegressionSGVB::new(x, 1, FixedGaussianPrior::default(), SGVBConfig::default(), &noise)?;
//! let likelihood = FixedGaussianLikelihood::new(y, 1.0);
//!
//! let mut optimizer = candle_nn::AdamW::new_lr(model.vars(), 0.1)?;
//! for _ in 0..num_iters {
//!     let loss = kl_elbo_loss(&model, &likelihood, 1)?;
//!     optimizer.backward_step(&loss)?;
//! }
//! ```

mod conjugate;
mod gaussian_prior;
mod likelihood;
mod random;
mod regression_linear;
mod sgvb;
mod traits;
mod variational_gaussian;

pub use conjugate::{exact_posterior, GaussianPosterior};
pub use gaussian_prior::FixedGaussianPrior;
pub use likelihood::FixedGaussianLikelihood;
pub use random::GaussianNoise;
pub use regression_linear::LinearRegressionSGVB;
pub use sgvb::{compute_elbo, direct_elbo_loss, kl_elbo_loss, sgvb_loss, SGVBConfig};
pub use traits::{AnalyticalKL, BlackBoxLikelihood, KlSample, Prior, SgvbModel, SgvbSample, VariationalDistribution};
pub use variational_gaussian::{softplus, GaussianVar};
