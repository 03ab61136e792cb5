use lentil::toy_data::*;

#[test]
fn shapes_match_for_even_n() -> anyhow::Result<()> {
    for n in [2, 10, 40, 100] {
        let data = build_toy_dataset(n, 0.1, 42)?;
        assert_eq!(data.x.dim(), (n, 1));
        assert_eq!(data.y.len(), n);
    }
    Ok(())
}

#[test]
fn noiseless_response_is_on_the_line() -> anyhow::Result<()> {
    let data = build_toy_dataset(40, 0.0, 42)?;
    for (x, y) in data.x.column(0).iter().zip(data.y.iter()) {
        assert_eq!(*y, SLOPE * x);
    }
    Ok(())
}

#[test]
fn two_evenly_spaced_segments() -> anyhow::Result<()> {
    let n = 40;
    let data = build_toy_dataset(n, 0.1, 42)?;
    let x = data.x.column(0).to_vec();
    let (first, second) = x.split_at(n / 2);

    for (seg, (lb, ub)) in [(first, FIRST_SEGMENT), (second, SECOND_SEGMENT)] {
        assert_eq!(seg[0], lb);
        assert_eq!(seg[seg.len() - 1], ub);
        assert!(seg.iter().all(|&v| v >= lb && v <= ub));

        let step = (ub - lb) / (seg.len() - 1) as f32;
        for w in seg.windows(2) {
            approx::assert_abs_diff_eq!(w[1] - w[0], step, epsilon = 1e-5);
        }
    }
    Ok(())
}

#[test]
fn same_seed_same_noise() -> anyhow::Result<()> {
    let a = build_toy_dataset(40, 0.1, 42)?;
    let b = build_toy_dataset(40, 0.1, 42)?;
    let c = build_toy_dataset(40, 0.1, 7)?;

    assert_eq!(a, b);
    assert_eq!(a.x, c.x);
    assert_ne!(a.y, c.y);
    Ok(())
}

#[test]
fn noise_has_the_requested_scale() -> anyhow::Result<()> {
    let noise_std = 0.5f32;
    let data = build_toy_dataset(10_000, noise_std, 1)?;
    let resid: Vec<f32> = data
        .x
        .column(0)
        .iter()
        .zip(data.y.iter())
        .map(|(x, y)| y - SLOPE * x)
        .collect();

    let n = resid.len() as f32;
    let mean = resid.iter().sum::<f32>() / n;
    let var = resid.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / (n - 1.0);

    assert!(mean.abs() < 0.05, "mean residual {}", mean);
    approx::assert_abs_diff_eq!(var.sqrt(), noise_std, epsilon = 0.03);
    Ok(())
}

#[test]
fn write_and_read_back() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let data = build_toy_dataset(12, 0.1, 42)?;

    for name in ["toy.tsv", "toy.csv.gz"] {
        let file = dir.path().join(name);
        let file = file.to_str().ok_or(anyhow::anyhow!("path"))?;

        data.to_file(file)?;
        let back = Dataset::from_file(file)?;
        assert_eq!(back, data);
    }
    Ok(())
}
