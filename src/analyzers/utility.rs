use crate::error::{PaceError, Result};

/// Drops missing (non-finite) entries and returns the rest sorted ascending.
pub fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Computes the arithmetic mean, ignoring non-finite entries.
pub fn mean(values: &[f64], stage: &'static str) -> Result<f64> {
    let (sum, n) = values
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    if n == 0 {
        return Err(PaceError::DegenerateStatistics { stage, points: 0 });
    }
    Ok(sum / n as f64)
}

/// Sample standard deviation (n − 1 denominator). Needs at least two points.
pub fn sample_stddev(values: &[f64], stage: &'static str) -> Result<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.len() < 2 {
        return Err(PaceError::DegenerateStatistics {
            stage,
            points: finite.len(),
        });
    }
    let m = finite.iter().sum::<f64>() / finite.len() as f64;
    let variance =
        finite.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (finite.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// Continuous quantile with linear interpolation between order statistics
/// (position `(n - 1) * p`). `sorted` must be ascending and finite.
pub fn quantile_sorted(sorted: &[f64], p: f64, stage: &'static str) -> Result<f64> {
    if sorted.is_empty() {
        return Err(PaceError::DegenerateStatistics { stage, points: 0 });
    }
    let p = p.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Ok(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Quantile of unsorted values, ignoring non-finite entries.
pub fn quantile(values: &[f64], p: f64, stage: &'static str) -> Result<f64> {
    quantile_sorted(&finite_sorted(values), p, stage)
}

pub fn median(values: &[f64], stage: &'static str) -> Result<f64> {
    quantile(values, 0.5, stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_ignores_missing() {
        let m = mean(&[1.0, f64::NAN, 3.0], "test").unwrap();
        assert!((m - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_empty_is_degenerate() {
        assert!(matches!(
            mean(&[], "test"),
            Err(PaceError::DegenerateStatistics { points: 0, .. })
        ));
        assert!(mean(&[f64::NAN], "test").is_err());
    }

    #[test]
    fn test_sample_stddev() {
        // var = ((2-5)^2 + (4-5)^2 + (4-5)^2 + (4-5)^2 + (5-5)^2 + (5-5)^2 + (7-5)^2 + (9-5)^2) / 7
        let sd = sample_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], "test").unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(matches!(
            sample_stddev(&[3.0], "test"),
            Err(PaceError::DegenerateStatistics { points: 1, .. })
        ));
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [10.0, 12.0, 11.0, 13.0, 50.0];
        assert_eq!(quantile(&v, 0.25, "test").unwrap(), 11.0);
        assert_eq!(quantile(&v, 0.75, "test").unwrap(), 13.0);
        let q = quantile(&[1.0, 2.0, 3.0, 4.0], 0.25, "test").unwrap();
        assert!((q - 1.75).abs() < 1e-12);
        let p90 = quantile(&[1.0, 2.0, 3.0, 4.0], 0.9, "test").unwrap();
        assert!((p90 - 3.7).abs() < 1e-12);
    }

    #[test]
    fn test_median_equals_p50() {
        for v in [vec![4.0, 1.0, 3.0], vec![4.0, 1.0, 3.0, 8.0], vec![2.5]] {
            assert_eq!(
                median(&v, "test").unwrap(),
                quantile(&v, 0.5, "test").unwrap()
            );
        }
        assert_eq!(median(&[4.0, 1.0, 3.0, 8.0], "test").unwrap(), 3.5);
    }

    #[test]
    fn test_single_point_quantile() {
        assert_eq!(quantile(&[7.0], 0.9, "test").unwrap(), 7.0);
    }
}
