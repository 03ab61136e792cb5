use candle_core::{Result, Tensor};

use super::traits::{AnalyticalKL, Prior};

/// Fixed (non-learnable) Gaussian prior p(θ) = N(m, τ²I)
#[derive(Debug, Clone, Copy)]
pub struct FixedGaussianPrior {
    /// Prior location m
    loc: f32,
    /// Prior scale τ
    scale: f32,
}

impl Default for FixedGaussianPrior {
    /// Standard normal N(0, 1)
    fn default() -> Self {
        Self {
            loc: 0.0,
            scale: 1.0,
        }
    }
}

impl FixedGaussianPrior {
    /// Create a new fixed Gaussian prior.
    ///
    /// # Arguments
    /// * `loc` - Prior location m
    /// * `scale` - Prior scale τ (> 0)
    pub fn new(loc: f32, scale: f32) -> Self {
        Self { loc, scale }
    }
}

impl Prior for FixedGaussianPrior {
    /// Compute log p(θ) = sum over all elements of log N(θ; m, τ²)
    ///
    /// log N(θ; m, τ²) = -0.5 * [(θ-m)²/τ² + 2*ln(τ) + ln(2π)]
    fn log_prob(&self, theta: &Tensor) -> Result<Tensor> {
        let ln_2pi: f64 = (2.0 * std::f64::consts::PI).ln();
        let ln_tau: f64 = (self.scale as f64).ln();
        let tau_sq: f64 = (self.scale as f64).powi(2);

        // (θ-m)²/τ²: shape (S, p, k)
        let theta_sq_normalized = ((theta - self.loc as f64)?.sqr()? / tau_sq)?;

        let const_term = 2.0 * ln_tau + ln_2pi;

        let log_prob_element = ((theta_sq_normalized + const_term)? * (-0.5))?;

        // Sum over dimensions 1 and 2 (p and k)
        log_prob_element.sum(2)?.sum(1)
    }
}

impl AnalyticalKL for FixedGaussianPrior {
    /// KL(N(μ, σ²) || N(m, τ²)) = ln(τ/σ) + (σ² + (μ-m)²)/(2τ²) - 1/2
    fn kl_from_gaussian(&self, mean: &Tensor, var: &Tensor) -> Result<Tensor> {
        let tau_sq = (self.scale as f64).powi(2);
        let ln_tau = (self.scale as f64).ln();

        let diff_sq = (mean - self.loc as f64)?.sqr()?;
        let ratio = ((var + &diff_sq)? / (2.0 * tau_sq))?;

        // ln(τ/σ) = ln τ - 0.5 ln σ²
        let ln_ratio = ((var.log()? * (-0.5))? + ln_tau)?;

        let kl = ((ln_ratio + ratio)? - 0.5)?;
        kl.sum_all()
    }
}
