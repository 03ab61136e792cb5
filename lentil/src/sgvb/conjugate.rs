use nalgebra::{DMatrix, DVector};

/// Closed-form posterior of the conjugate Gaussian linear model
///
/// ```text
/// β ~ N(0, τ² I),   y | X, β ~ N(X β, σ² I)
/// Σ = (I/τ² + XᵀX/σ²)⁻¹,   μ = Σ Xᵀ y / σ²
/// ```
#[derive(Debug, Clone)]
pub struct GaussianPosterior {
    pub mean: DVector<f64>,
    pub cov: DMatrix<f64>,
}

impl GaussianPosterior {
    /// Marginal standard deviations sqrt(diag(Σ))
    pub fn std(&self) -> DVector<f64> {
        self.cov.diagonal().map(f64::sqrt)
    }
}

/// Exact posterior for `x` (n x p, row-major) and `y` (n)
///
/// * `prior_scale` - τ
/// * `noise_std` - σ
pub fn exact_posterior(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    prior_scale: f64,
    noise_std: f64,
) -> anyhow::Result<GaussianPosterior> {
    anyhow::ensure!(
        x.nrows() == y.len(),
        "x has {} rows but y has {} entries",
        x.nrows(),
        y.len()
    );
    anyhow::ensure!(prior_scale > 0.0 && noise_std > 0.0, "scales must be positive");

    let p = x.ncols();
    let noise_var = noise_std * noise_std;
    let prior_var = prior_scale * prior_scale;

    let precision = DMatrix::<f64>::identity(p, p) / prior_var + x.transpose() * x / noise_var;

    let chol = precision
        .cholesky()
        .ok_or(anyhow::anyhow!("posterior precision is not positive definite"))?;

    let cov = chol.inverse();
    let mean = chol.solve(&(x.transpose() * y / noise_var));

    Ok(GaussianPosterior { mean, cov })
}
