use candle_core::{DType, Device, Result, Tensor, Var};

use super::random::GaussianNoise;
use super::traits::VariationalDistribution;

/// Gaussian variational distribution q(θ) = N(μ, σ²I)
///
/// Uses mean-field approximation with diagonal covariance.
/// Parameters are stored as mean μ and an unconstrained ρ with σ = softplus(ρ).
pub struct GaussianVar<'a> {
    /// Variational mean μ: shape (p, k)
    mean: Var,
    /// Pre-softplus scale ρ: shape (p, k)
    raw_std: Var,
    /// Source of ε for the reparameterization
    noise: &'a GaussianNoise,
}

/// softplus(x) = ln(1 + eˣ) = max(x, 0) + ln(1 + e^{-|x|})
pub fn softplus(x: &Tensor) -> Result<Tensor> {
    let tail = ((x.abs()?.neg()?.exp()? + 1.0)?).log()?;
    x.relu()? + tail
}

impl<'a> GaussianVar<'a> {
    /// Create a new Gaussian variational distribution.
    ///
    /// # Arguments
    /// * `p` - Number of input features
    /// * `k` - Number of output dimensions
    /// * `dtype`, `device` - where the parameters live
    /// * `noise` - seeded noise for initialization and sampling
    ///
    /// # Returns
    /// GaussianVar with μ ~ N(0, 1) and ρ ~ N(0, 1)
    pub fn new(
        p: usize,
        k: usize,
        dtype: DType,
        device: &Device,
        noise: &'a GaussianNoise,
    ) -> Result<Self> {
        let mean = noise.randn((p, k), dtype, device)?;
        let raw_std = noise.randn((p, k), dtype, device)?;
        Self::from_init(&mean, &raw_std, noise)
    }

    /// Start from the given μ and ρ
    pub fn from_init(mean: &Tensor, raw_std: &Tensor, noise: &'a GaussianNoise) -> Result<Self> {
        Ok(Self {
            mean: Var::from_tensor(mean)?,
            raw_std: Var::from_tensor(raw_std)?,
            noise,
        })
    }

    /// Trainable variables [μ, ρ]
    pub fn vars(&self) -> Vec<Var> {
        vec![self.mean.clone(), self.raw_std.clone()]
    }

    /// Get the variational standard deviation σ = softplus(ρ).
    pub fn std(&self) -> Result<Tensor> {
        softplus(self.raw_std.as_tensor())
    }

    pub fn device(&self) -> &Device {
        self.mean.device()
    }

    pub fn dtype(&self) -> DType {
        self.mean.dtype()
    }
}

impl VariationalDistribution for GaussianVar<'_> {
    /// Sample using reparameterization: θ = μ + σ * ε where ε ~ N(0, I)
    fn sample(&self, num_samples: usize) -> Result<(Tensor, Tensor)> {
        let (p, k) = self.mean.dims2()?;

        // ε ~ N(0, I): shape (S, p, k)
        let epsilon = self
            .noise
            .randn((num_samples, p, k), self.dtype(), self.device())?;

        let std = self.std()?;

        // θ = μ + σ * ε: broadcast (p, k) + (p, k) * (S, p, k) -> (S, p, k)
        let theta = self
            .mean
            .as_tensor()
            .unsqueeze(0)?
            .broadcast_add(&epsilon.broadcast_mul(&std)?)?;

        Ok((theta, epsilon))
    }

    /// Compute log q(θ|μ,σ) = sum over (p,k) of log N(θ; μ, σ²)
    ///
    /// log N(θ; μ, σ²) = -0.5 * [(θ-μ)²/σ² + 2*ln(σ) + ln(2π)]
    fn log_prob(&self, theta: &Tensor) -> Result<Tensor> {
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();

        let std = self.std()?;

        // (θ - μ)²/σ²: shape (S, p, k)
        let diff = theta.broadcast_sub(self.mean.as_tensor())?;
        let normalized_sq = diff.sqr()?.broadcast_div(&std.sqr()?)?;

        let two_ln_std = (std.log()? * 2.0)?;
        let log_prob_element = ((normalized_sq.broadcast_add(&two_ln_std)? + ln_2pi)? * (-0.5))?;

        // Sum over dimensions 1 and 2 (p and k)
        log_prob_element.sum(2)?.sum(1)
    }

    fn mean(&self) -> Result<Tensor> {
        Ok(self.mean.as_tensor().clone())
    }

    fn var(&self) -> Result<Tensor> {
        self.std()?.sqr()
    }
}
