use candle_core::{Result, Tensor, Var};

use super::random::GaussianNoise;
use super::sgvb::SGVBConfig;
use super::traits::{AnalyticalKL, KlSample, Prior, SgvbModel, SgvbSample, VariationalDistribution};
use super::variational_gaussian::GaussianVar;

/// Linear regression SGVB model: η = X * θ where θ ~ q(θ) = N(μ, σ²I)
///
/// Bundles
/// - the mean-field Gaussian for the regression coefficients
/// - the prior on the coefficients
/// - the design matrix for the linear predictor
pub struct LinearRegressionSGVB<'a, P> {
    /// Variational distribution for coefficients θ
    pub variational: GaussianVar<'a>,
    /// Prior distribution p(θ)
    pub prior: P,
    /// Design matrix X: (n, p)
    pub x_design: Tensor,
    /// SGVB configuration
    pub config: SGVBConfig,
}

impl<'a, P: Prior> LinearRegressionSGVB<'a, P> {
    /// Create a new linear regression SGVB model.
    ///
    /// # Arguments
    /// * `x_design` - Design matrix X, shape (n, p)
    /// * `k` - Number of output dimensions
    /// * `prior` - Prior distribution
    /// * `config` - SGVB configuration
    /// * `noise` - seeded noise shared by initialization and sampling
    pub fn new(
        x_design: Tensor,
        k: usize,
        prior: P,
        config: SGVBConfig,
        noise: &'a GaussianNoise,
    ) -> Result<Self> {
        let p = x_design.dim(1)?;
        let variational = GaussianVar::new(p, k, x_design.dtype(), x_design.device(), noise)?;
        Ok(Self::from_variational(variational, x_design, prior, config))
    }

    pub fn from_variational(
        variational: GaussianVar<'a>,
        x_design: Tensor,
        prior: P,
        config: SGVBConfig,
    ) -> Self {
        Self {
            variational,
            prior,
            x_design,
            config,
        }
    }

    /// Compute the posterior mean prediction η = X @ μ_θ, shape (n, k)
    pub fn eta_mean(&self) -> Result<Tensor> {
        self.x_design.matmul(&self.variational.mean()?)
    }

    /// Variational mean of coefficients μ_θ, shape (p, k)
    pub fn coef_mean(&self) -> Result<Tensor> {
        self.variational.mean()
    }

    /// Variational standard deviation of coefficients σ_θ, shape (p, k)
    pub fn coef_std(&self) -> Result<Tensor> {
        self.variational.std()
    }

    /// Trainable variables of q(θ)
    pub fn vars(&self) -> Vec<Var> {
        self.variational.vars()
    }

    /// η = X @ θ for θ of shape (S, p, k)
    fn linear_predictor(&self, theta: &Tensor) -> Result<Tensor> {
        self.x_design.unsqueeze(0)?.broadcast_matmul(theta)
    }
}

impl<P: Prior + AnalyticalKL> LinearRegressionSGVB<'_, P> {
    /// Sample η through θ = μ + σε and pair it with the closed-form
    /// KL(q || p) instead of Monte Carlo log densities.
    pub fn kl_sample(&self, num_samples: usize) -> Result<KlSample> {
        let (theta, _) = self.variational.sample(num_samples)?;
        let eta = self.linear_predictor(&theta)?;
        let kl = self
            .prior
            .kl_from_gaussian(&self.variational.mean()?, &self.variational.var()?)?;
        Ok(KlSample { eta, kl })
    }
}

impl<P: Prior> SgvbModel for LinearRegressionSGVB<'_, P> {
    fn sample(&self, num_samples: usize) -> Result<SgvbSample> {
        // 1. Sample θ from variational distribution
        let (theta, _) = self.variational.sample(num_samples)?;

        // 2. Compute η = X @ θ
        let eta = self.linear_predictor(&theta)?;

        // 3. Compute log_prior and log_q
        let log_prior = self.prior.log_prob(&theta)?;
        let log_q = self.variational.log_prob(&theta)?;
        let log_q_grad = self.variational.log_prob(&theta.detach())?;

        Ok(SgvbSample {
            eta,
            log_prior,
            log_q,
            log_q_grad,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sgvb::FixedGaussianPrior;
    use candle_core::{DType, Device, Tensor};

    #[test]
    fn test_linear_sgvb_construction() -> Result<()> {
        let device = Device::Cpu;
        let noise = GaussianNoise::new(3);

        let n = 50;
        let p = 10;
        let k = 1;

        let x = noise.randn((n, p), DType::F32, &device)?;
        let model = LinearRegressionSGVB::new(
            x,
            k,
            FixedGaussianPrior::default(),
            SGVBConfig::default(),
            &noise,
        )?;

        assert_eq!(model.coef_mean()?.dims(), &[p, k]);
        assert_eq!(model.coef_std()?.dims(), &[p, k]);
        assert_eq!(model.eta_mean()?.dims(), &[n, k]);

        let sample = model.sample(7)?;
        assert_eq!(sample.eta.dims(), &[7, n, k]);
        assert_eq!(sample.log_prior.dims(), &[7]);
        assert_eq!(sample.log_q.dims(), &[7]);

        let kl_sample = model.kl_sample(4)?;
        assert_eq!(kl_sample.eta.dims(), &[4, n, k]);
        assert!(kl_sample.kl.dims().is_empty());

        Ok(())
    }

    #[test]
    fn test_eta_is_x_times_theta() -> Result<()> {
        let device = Device::Cpu;
        let noise = GaussianNoise::new(3);

        // σ ≈ 0 so every sample sits on the mean
        let mean = Tensor::new(&[[2f32]], &device)?;
        let raw_std = Tensor::new(&[[-40f32]], &device)?;
        let variational = GaussianVar::from_init(&mean, &raw_std, &noise)?;

        let x = Tensor::new(&[[1f32], [3.0]], &device)?;
        let model = LinearRegressionSGVB::from_variational(
            variational,
            x,
            FixedGaussianPrior::default(),
            SGVBConfig::default(),
        );

        let eta: Vec<f32> = model.sample(1)?.eta.flatten_all()?.to_vec1()?;
        assert!((eta[0] - 2.0).abs() < 1e-5);
        assert!((eta[1] - 6.0).abs() < 1e-5);

        Ok(())
    }
}
