use crate::common_io::{delimiter_for, read_lines, write_lines};

use candle_core::{Device, Tensor};
use log::info;
use ndarray::{concatenate, Array1, Array2, Axis};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Slope of the line both segments of the toy data sit on
pub const SLOPE: f32 = 5.0;

/// Support of the first half of the features
pub const FIRST_SEGMENT: (f32, f32) = (0.0, 2.0);

/// Support of the second half of the features
pub const SECOND_SEGMENT: (f32, f32) = (6.0, 8.0);

/// Regression data held in memory: `x` is `n x p`, `y` has `n` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f32>,
    pub y: Array1<f32>,
}

/// `num` evenly spaced points from `start` to `end`, both included.
/// Spacing is computed in double precision and the last point is `end` exactly.
pub fn linspace(start: f32, end: f32, num: usize) -> Array1<f32> {
    if num == 1 {
        return Array1::from_elem(1, start);
    }
    let (a, b) = (start as f64, end as f64);
    let step = (b - a) / (num.max(2) - 1) as f64;
    Array1::from_shape_fn(num, |i| {
        if i + 1 == num {
            end
        } else {
            (a + step * i as f64) as f32
        }
    })
}

/// Build the toy dataset
///
/// * `n`: number of data points (positive and even)
/// * `noise_std`: standard deviation of the additive noise
/// * `rseed`: random seed for the noise
///
/// ```text
/// x = [linspace(0, 2, n/2), linspace(6, 8, n/2)]
/// y = 5 * x + N(0, noise_std^2)
/// ```
///
pub fn build_toy_dataset(n: usize, noise_std: f32, rseed: u64) -> anyhow::Result<Dataset> {
    anyhow::ensure!(n > 0 && n % 2 == 0, "need a positive, even n: {}", n);
    anyhow::ensure!(
        noise_std.is_finite() && noise_std >= 0.0,
        "noise_std must be finite and non-negative: {}",
        noise_std
    );

    let half = n / 2;
    let first = linspace(FIRST_SEGMENT.0, FIRST_SEGMENT.1, half);
    let second = linspace(SECOND_SEGMENT.0, SECOND_SEGMENT.1, half);
    let x_n = concatenate(Axis(0), &[first.view(), second.view()])?;

    let mut rng = rand::rngs::StdRng::seed_from_u64(rseed);
    let noise = Normal::new(0f32, noise_std)?;

    let y = x_n.mapv(|x| SLOPE * x + noise.sample(&mut rng));
    let x = x_n.insert_axis(Axis(1));

    Ok(Dataset { x, y })
}

impl Dataset {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.x.ncols()
    }

    /// Design matrix `(n, p)` and response `(n, 1)` as single precision tensors
    pub fn to_tensors(&self, device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
        let (n, p) = self.x.dim();
        let x: Vec<f32> = self.x.iter().copied().collect();
        let y: Vec<f32> = self.y.iter().copied().collect();
        let x = Tensor::from_vec(x, (n, p), device)?;
        let y = Tensor::from_vec(y, (n, 1), device)?;
        Ok((x, y))
    }

    /// Write the data with a header line, features first and the
    /// response in the last column. `.csv` files are comma-separated,
    /// everything else tab-separated; `.gz` compresses.
    pub fn to_file(&self, file: &str) -> anyhow::Result<()> {
        let delim = delimiter_for(file);
        let p = self.ncols();

        let mut header: Vec<String> = if p == 1 {
            vec!["x".to_string()]
        } else {
            (1..=p).map(|j| format!("x{}", j)).collect()
        };
        header.push("y".to_string());

        let mut lines = Vec::with_capacity(self.nrows() + 1);
        lines.push(header.join(delim));
        for (row, y) in self.x.outer_iter().zip(self.y.iter()) {
            let mut words: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            words.push(y.to_string());
            lines.push(words.join(delim));
        }

        write_lines(&lines, file)?;
        info!("wrote {} x {} data: {}", self.nrows(), p, file);
        Ok(())
    }

    /// Read data written by [`Dataset::to_file`]: one header line, then
    /// rows of numbers with the response in the last column.
    pub fn from_file(file: &str) -> anyhow::Result<Self> {
        let delim = delimiter_for(file);
        let lines = read_lines(file)?;

        let mut rows = lines
            .iter()
            .filter(|l| !l.trim().is_empty() && !l.starts_with('#'));

        let header = rows.next().ok_or(anyhow::anyhow!("empty file: {}", file))?;
        let ncol = header.split(delim).count();
        anyhow::ensure!(ncol >= 2, "need at least one feature and a response");
        let p = ncol - 1;

        let mut x_flat = vec![];
        let mut y_flat = vec![];
        for (i, line) in rows.enumerate() {
            let words = line
                .split(delim)
                .map(|w| w.trim().parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow::anyhow!("line {} of {}: {}", i + 2, file, e))?;
            anyhow::ensure!(
                words.len() == ncol,
                "line {} of {} has {} columns, expected {}",
                i + 2,
                file,
                words.len(),
                ncol
            );
            x_flat.extend_from_slice(&words[..p]);
            y_flat.push(words[p]);
        }

        let n = y_flat.len();
        anyhow::ensure!(n > 0, "no data rows in {}", file);

        let x = Array2::from_shape_vec((n, p), x_flat)?;
        let y = Array1::from_vec(y_flat);
        info!("read {} x {} data: {}", n, p, file);
        Ok(Dataset { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() -> anyhow::Result<()> {
        let data = build_toy_dataset(40, 0.1, 42)?;
        assert_eq!(data.x.dim(), (40, 1));
        assert_eq!(data.y.len(), 40);
        Ok(())
    }

    #[test]
    fn test_odd_or_empty_rejected() {
        assert!(build_toy_dataset(41, 0.1, 42).is_err());
        assert!(build_toy_dataset(0, 0.1, 42).is_err());
        assert!(build_toy_dataset(10, -1.0, 42).is_err());
        assert!(build_toy_dataset(10, f32::NAN, 42).is_err());
    }

    #[test]
    fn test_linspace() {
        let v = linspace(6.0, 8.0, 5);
        assert_eq!(v.to_vec(), vec![6.0, 6.5, 7.0, 7.5, 8.0]);
        assert_eq!(linspace(0.0, 2.0, 1).to_vec(), vec![0.0]);
        assert!(linspace(0.0, 2.0, 0).is_empty());
    }

    #[test]
    fn test_tensors() -> anyhow::Result<()> {
        let data = build_toy_dataset(6, 0.0, 1)?;
        let (x, y) = data.to_tensors(&Device::Cpu)?;
        assert_eq!(x.dims(), &[6, 1]);
        assert_eq!(y.dims(), &[6, 1]);

        let y_vec: Vec<f32> = y.flatten_all()?.to_vec1()?;
        assert_eq!(y_vec, data.y.to_vec());
        Ok(())
    }
}
