use candle_core::{Result, Tensor};

/// Black-box likelihood trait.
/// The likelihood function is treated as a black box - no gradients flow through it
/// under the score-function estimator.
pub trait BlackBoxLikelihood {
    /// Evaluate log p(y|η)
    ///
    /// # Arguments
    /// * `etas` - Slice of linear predictor tensors, each shape (S, n, k) for S samples
    ///
    /// # Returns
    /// Log-likelihood values, shape (S,) summed over observations, or (S, n) per observation
    fn log_likelihood(&self, etas: &[&Tensor]) -> Result<Tensor>;
}

/// Variational distribution trait.
pub trait VariationalDistribution {
    /// Draw S reparameterized samples.
    ///
    /// # Returns
    /// (theta, epsilon), both shape (S, p, k)
    fn sample(&self, num_samples: usize) -> Result<(Tensor, Tensor)>;

    /// Compute log q(θ), shape (S,) summed over parameter dimensions
    fn log_prob(&self, theta: &Tensor) -> Result<Tensor>;

    /// Get the variational mean μ, shape (p, k)
    fn mean(&self) -> Result<Tensor>;

    /// Get the variational variance σ², shape (p, k)
    fn var(&self) -> Result<Tensor>;
}

/// Prior distribution trait.
pub trait Prior {
    /// Compute log p(θ) under the prior.
    ///
    /// # Arguments
    /// * `theta` - Parameter samples, shape (S, p, k)
    ///
    /// # Returns
    /// Log prior probability, shape (S,) summed over parameter dimensions
    fn log_prob(&self, theta: &Tensor) -> Result<Tensor>;
}

/// Trait for priors that support analytical KL divergence from a Gaussian q.
pub trait AnalyticalKL {
    /// KL(N(mean, diag(var)) || prior), summed over all (p, k) elements.
    ///
    /// # Arguments
    /// * `mean` - Variational mean, shape (p, k)
    /// * `var` - Variational variance, shape (p, k)
    ///
    /// # Returns
    /// Scalar tensor with the KL divergence
    fn kl_from_gaussian(&self, mean: &Tensor, var: &Tensor) -> Result<Tensor>;
}

/// Monte Carlo sample of everything the ELBO needs.
pub struct SgvbSample {
    /// Linear predictor samples, shape (S, n, k)
    pub eta: Tensor,
    /// log p(θ), shape (S,)
    pub log_prior: Tensor,
    /// log q(θ) with gradients through θ, shape (S,)
    pub log_q: Tensor,
    /// log q(θ) with θ detached (score function), shape (S,)
    pub log_q_grad: Tensor,
}

/// Sample output when the KL term is available in closed form.
pub struct KlSample {
    /// Linear predictor samples, shape (S, n, k)
    pub eta: Tensor,
    /// Analytical KL divergence, scalar
    pub kl: Tensor,
}

/// Models that can produce ELBO samples.
pub trait SgvbModel {
    fn sample(&self, num_samples: usize) -> Result<SgvbSample>;
}
