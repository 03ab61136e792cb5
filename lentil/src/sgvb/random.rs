use candle_core::{DType, Device, Result, Shape, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::cell::RefCell;

/// Seeded source of standard normal draws.
///
/// `Tensor::randn` on the CPU device cannot be seeded, so every
/// stochastic quantity of a fit (initial values and the ε of the
/// reparameterization) is drawn here instead.
pub struct GaussianNoise {
    rng: RefCell<StdRng>,
}

impl GaussianNoise {
    pub fn new(rseed: u64) -> Self {
        Self {
            rng: RefCell::new(StdRng::seed_from_u64(rseed)),
        }
    }

    /// ε ~ N(0, I) of the given shape
    pub fn randn<S: Into<Shape>>(&self, shape: S, dtype: DType, device: &Device) -> Result<Tensor> {
        let shape: Shape = shape.into();
        let mut rng = self.rng.borrow_mut();
        let eps: Vec<f32> = (0..shape.elem_count())
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        Tensor::from_vec(eps, shape, device)?.to_dtype(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_draws() -> Result<()> {
        let a = GaussianNoise::new(7).randn((3, 2), DType::F32, &Device::Cpu)?;
        let b = GaussianNoise::new(7).randn((3, 2), DType::F32, &Device::Cpu)?;
        assert_eq!(a.dims(), &[3, 2]);

        let a: Vec<f32> = a.flatten_all()?.to_vec1()?;
        let b: Vec<f32> = b.flatten_all()?.to_vec1()?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_successive_draws_differ() -> Result<()> {
        let noise = GaussianNoise::new(7);
        let a: Vec<f32> = noise.randn(4, DType::F32, &Device::Cpu)?.to_vec1()?;
        let b: Vec<f32> = noise.randn(4, DType::F32, &Device::Cpu)?.to_vec1()?;
        assert_ne!(a, b);
        Ok(())
    }
}
