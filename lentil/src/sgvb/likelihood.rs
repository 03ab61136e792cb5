//! Gaussian likelihood for continuous responses.

use candle_core::{Result, Tensor};

use super::traits::BlackBoxLikelihood;

/// Fixed-variance Gaussian likelihood: y ~ N(η, σ²) with known σ².
///
/// Only requires 1 eta (the mean).
pub struct FixedGaussianLikelihood {
    y: Tensor,
    inv_2var: f64,
    log_2pi_var: f64,
}

impl FixedGaussianLikelihood {
    /// * `y` - observations, shape (n, k)
    /// * `variance` - known noise variance σ²
    pub fn new(y: Tensor, variance: f64) -> Self {
        Self {
            y,
            inv_2var: 0.5 / variance,
            log_2pi_var: (2.0 * std::f64::consts::PI * variance).ln(),
        }
    }

    pub fn y(&self) -> &Tensor {
        &self.y
    }
}

impl BlackBoxLikelihood for FixedGaussianLikelihood {
    fn log_likelihood(&self, etas: &[&Tensor]) -> Result<Tensor> {
        let eta = etas[0]; // (S, n, k)
        let diff_sq = eta.broadcast_sub(&self.y)?.sqr()?;
        let log_prob = ((diff_sq * (-self.inv_2var))? + (-0.5 * self.log_2pi_var))?;
        log_prob.sum(2)?.sum(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_perfect_fit() -> Result<()> {
        let device = Device::Cpu;

        let y = Tensor::from_vec(vec![0.0f32, 1.0, 2.0], (3, 1), &device)?;
        let eta = Tensor::from_vec(vec![0.0f32, 1.0, 2.0], (1, 3, 1), &device)?;

        let likelihood = FixedGaussianLikelihood::new(y, 1.0);
        let log_lik = likelihood.log_likelihood(&[&eta])?;
        assert_eq!(log_lik.dims(), &[1]);

        // -0.5 * 3 * ln(2π)
        let val: f32 = log_lik.get(0)?.to_scalar()?;
        let expected = -1.5 * (2.0 * std::f32::consts::PI).ln();
        assert!((val - expected).abs() < 1e-5, "Expected {}, got {}", expected, val);

        Ok(())
    }

    #[test]
    fn test_residual_penalty() -> Result<()> {
        let device = Device::Cpu;

        let y = Tensor::zeros((2, 1), candle_core::DType::F64, &device)?;
        // two samples: residuals 0 and 2 on both points
        let eta = Tensor::new(&[[[0f64], [0.0]], [[2.0], [2.0]]], &device)?;

        let likelihood = FixedGaussianLikelihood::new(y, 4.0);
        let log_lik: Vec<f64> = likelihood.log_likelihood(&[&eta])?.to_vec1()?;

        // each residual of 2 under σ² = 4 costs 0.5 nats
        assert!((log_lik[0] - log_lik[1] - 1.0).abs() < 1e-10);
        Ok(())
    }
}
