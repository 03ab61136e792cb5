use candle_core::{Result, Tensor};

use super::regression_linear::LinearRegressionSGVB;
use super::traits::{AnalyticalKL, BlackBoxLikelihood, Prior, SgvbModel};

/// Configuration for SGVB estimator.
#[derive(Debug, Clone)]
pub struct SGVBConfig {
    /// Number of Monte Carlo samples S for gradient estimation
    pub num_samples: usize,
}

impl Default for SGVBConfig {
    fn default() -> Self {
        Self { num_samples: 1 }
    }
}

impl SGVBConfig {
    /// Create a new SGVB configuration.
    pub fn new(num_samples: usize) -> Self {
        Self { num_samples }
    }
}

/// Sum per-observation log-likelihoods down to one value per sample
fn per_sample(llik: Tensor) -> Result<Tensor> {
    if llik.rank() > 1 {
        llik.sum(1)
    } else {
        Ok(llik)
    }
}

/// Compute the SGVB surrogate loss using score function (REINFORCE) estimator.
///
/// The ELBO is: E_q[log p(y|η) + log p(θ) - log q(θ)]
///
/// We use the score function gradient estimator:
/// ∇ELBO ≈ E[(normalized_reward) * ∇log q(θ)]
///
/// With control variate: reward = (reward - mean) / std, which needs at
/// least two samples.
///
/// # Returns
/// Surrogate loss (scalar) that when differentiated gives REINFORCE gradients
pub fn sgvb_loss<M, L>(model: &M, likelihood: &L, config: &SGVBConfig) -> Result<Tensor>
where
    M: SgvbModel,
    L: BlackBoxLikelihood,
{
    if config.num_samples < 2 {
        candle_core::bail!(
            "score function estimator needs at least 2 samples, got {}",
            config.num_samples
        );
    }

    let sample = model.sample(config.num_samples)?;

    let llik = per_sample(likelihood.log_likelihood(&[&sample.eta])?)?;

    // Reward = log p(y|η) + log p(θ) - log q(θ)
    let reward = ((&llik + &sample.log_prior)? - &sample.log_q)?;

    // Normalize reward (control variate)
    let mean = reward.mean(0)?;
    let std = (reward.var(0)? + 1e-8)?.sqrt()?;
    let reward_norm = reward.broadcast_sub(&mean)?.broadcast_div(&std)?;

    // No gradient through the reward itself
    let reward_detached = reward_norm.detach();

    (&reward_detached * &sample.log_q_grad)?.mean(0)?.neg()
}

/// Compute the raw ELBO (for monitoring, not for gradients).
///
/// ELBO = E_q[log p(y|η) + log p(θ) - log q(θ)]
///
/// # Returns
/// Mean ELBO estimate over samples (scalar)
pub fn compute_elbo<M, L>(model: &M, likelihood: &L, num_samples: usize) -> Result<Tensor>
where
    M: SgvbModel,
    L: BlackBoxLikelihood,
{
    let sample = model.sample(num_samples)?;

    let llik = per_sample(likelihood.log_likelihood(&[&sample.eta])?)?;

    let elbo = ((&llik + &sample.log_prior)? - &sample.log_q)?;
    elbo.detach().mean(0)
}

/// Compute direct ELBO loss with reparameterization gradients.
///
/// Unlike `sgvb_loss` which uses REINFORCE (score function estimator),
/// this computes -ELBO directly and lets gradients flow through
/// θ = μ + σε into the likelihood, prior and entropy terms.
///
/// # Returns
/// Negative ELBO (scalar) - minimize this to maximize ELBO
pub fn direct_elbo_loss<M, L>(model: &M, likelihood: &L, num_samples: usize) -> Result<Tensor>
where
    M: SgvbModel,
    L: BlackBoxLikelihood,
{
    let sample = model.sample(num_samples)?;

    let llik = per_sample(likelihood.log_likelihood(&[&sample.eta])?)?;

    // ELBO = log_lik + log_prior - log_q
    let elbo = ((&llik + &sample.log_prior)? - &sample.log_q)?;

    elbo.mean(0)?.neg()
}

/// Reparameterized loss with the KL term in closed form:
///
/// -ELBO = -E_q[log p(y|η)] + KL(q(θ) || p(θ))
pub fn kl_elbo_loss<P, L>(
    model: &LinearRegressionSGVB<'_, P>,
    likelihood: &L,
    num_samples: usize,
) -> Result<Tensor>
where
    P: Prior + AnalyticalKL,
    L: BlackBoxLikelihood,
{
    let sample = model.kl_sample(num_samples)?;
    let llik = per_sample(likelihood.log_likelihood(&[&sample.eta])?)?;

    // ELBO = E[log p(y|η)] − KL
    let elbo = (llik.mean(0)? - sample.kl)?;
    elbo.neg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgvb::{FixedGaussianLikelihood, FixedGaussianPrior, GaussianNoise};
    use candle_core::{DType, Device};

    fn toy_model<'a>(noise: &'a GaussianNoise) -> Result<(LinearRegressionSGVB<'a, FixedGaussianPrior>, FixedGaussianLikelihood)> {
        let device = Device::Cpu;
        let (n, p, k) = (20, 3, 1);

        let x = noise.randn((n, p), DType::F32, &device)?;
        let y = noise.randn((n, k), DType::F32, &device)?;

        let model = LinearRegressionSGVB::new(
            x,
            k,
            FixedGaussianPrior::default(),
            SGVBConfig::new(10),
            noise,
        )?;
        Ok((model, FixedGaussianLikelihood::new(y, 1.0)))
    }

    #[test]
    fn test_losses_are_scalars() -> Result<()> {
        let noise = GaussianNoise::new(11);
        let (model, likelihood) = toy_model(&noise)?;

        let loss = sgvb_loss(&model, &likelihood, &model.config)?;
        assert!(loss.dims().is_empty());

        let loss = direct_elbo_loss(&model, &likelihood, 10)?;
        assert!(loss.dims().is_empty());

        let loss = kl_elbo_loss(&model, &likelihood, 10)?;
        assert!(loss.dims().is_empty());
        assert!(loss.to_scalar::<f32>()?.is_finite());

        let elbo = compute_elbo(&model, &likelihood, 100)?;
        assert!(elbo.dims().is_empty());

        Ok(())
    }

    #[test]
    fn test_score_function_needs_two_samples() -> Result<()> {
        let noise = GaussianNoise::new(11);
        let (model, likelihood) = toy_model(&noise)?;

        assert!(sgvb_loss(&model, &likelihood, &SGVBConfig::new(1)).is_err());
        assert!(sgvb_loss(&model, &likelihood, &SGVBConfig::new(2)).is_ok());
        Ok(())
    }

    #[test]
    fn test_elbo_is_minus_the_loss() -> Result<()> {
        // the same estimate, seen from both sides
        let noise = GaussianNoise::new(5);
        let (model, likelihood) = toy_model(&noise)?;

        let elbo: f32 = compute_elbo(&model, &likelihood, 20_000)?.to_scalar()?;
        let loss: f32 = kl_elbo_loss(&model, &likelihood, 20_000)?.to_scalar()?;

        let rel = (elbo + loss).abs() / loss.abs().max(1.0);
        assert!(rel < 0.05, "elbo {} vs loss {}", elbo, loss);
        Ok(())
    }

    #[test]
    fn test_kl_and_monte_carlo_agree_on_average() -> Result<()> {
        // Both estimate the same -ELBO; with many samples they must agree
        let noise = GaussianNoise::new(5);
        let (model, likelihood) = toy_model(&noise)?;

        let analytic: f32 = kl_elbo_loss(&model, &likelihood, 20_000)?.to_scalar()?;
        let monte_carlo: f32 = direct_elbo_loss(&model, &likelihood, 20_000)?.to_scalar()?;

        let rel = (analytic - monte_carlo).abs() / analytic.abs().max(1.0);
        assert!(rel < 0.05, "analytic {} vs monte carlo {}", analytic, monte_carlo);
        Ok(())
    }

    #[test]
    fn test_gradients_reach_variational_params() -> Result<()> {
        let noise = GaussianNoise::new(9);
        let (model, likelihood) = toy_model(&noise)?;

        let loss = kl_elbo_loss(&model, &likelihood, 4)?;
        let grads = loss.backward()?;
        for var in model.vars() {
            assert!(grads.get(&var).is_some());
        }
        Ok(())
    }
}
