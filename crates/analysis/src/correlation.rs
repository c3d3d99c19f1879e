//! Pearson correlation
//!
//! Correlation coefficient with a two-tailed p-value via the Fisher
//! z-transform and a normal approximation. The p-value is approximate but
//! indistinguishable from the exact t-distribution at the sample sizes
//! raster validation produces (tens of thousands of pixels).

use fuelsight_core::{Error, Result};

/// Result of a Pearson correlation.
#[derive(Debug, Clone, Copy)]
pub struct Correlation {
    /// Correlation coefficient in [-1, 1]
    pub r: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// Sample size
    pub n: usize,
}

impl Correlation {
    /// Fraction of variance explained
    pub fn r_squared(&self) -> f64 {
        self.r * self.r
    }
}

/// Pearson correlation coefficient of two equal-length sequences.
///
/// Fails with a typed error on length mismatch, fewer than 3 samples, or
/// zero variance in either input (where the coefficient is undefined).
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation> {
    if x.len() != y.len() {
        return Err(Error::SizeMismatch {
            er: 1,
            ec: x.len(),
            ar: 1,
            ac: y.len(),
        });
    }
    let n = x.len();
    if n < 3 {
        return Err(Error::InsufficientSamples { count: n, minimum: 3 });
    }

    let nf = n as f64;
    let mean_x = x.iter().sum::<f64>() / nf;
    let mean_y = y.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x < f64::EPSILON {
        return Err(Error::ZeroVariance("first sequence"));
    }
    if var_y < f64::EPSILON {
        return Err(Error::ZeroVariance("second sequence"));
    }

    let r = (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);

    // Fisher z: atanh(r) * sqrt(n - 3) is approximately standard normal
    // under the null. |r| = 1 gives an infinite z and p = 0.
    let p_value = if r.abs() >= 1.0 {
        0.0
    } else if n == 3 {
        1.0
    } else {
        let z = r.atanh() * ((n - 3) as f64).sqrt();
        2.0 * normal_cdf(-z.abs())
    };

    Ok(Correlation { r, p_value, n })
}

/// Approximate CDF of the standard normal distribution.
/// Abramowitz & Stegun 26.2.17 (error < 7.5e-8).
pub fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989422804014327; // 1/sqrt(2*pi)
    let p = d * (-x * x / 2.0).exp()
        * (t * (0.3193815
            + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274)))));

    if x > 0.0 {
        1.0 - p
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_linear_fit() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();

        let c = pearson(&x, &y).unwrap();
        assert_relative_eq!(c.r, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.r_squared(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.p_value, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn perfect_anticorrelation() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| -0.5 * v + 3.0).collect();

        let c = pearson(&x, &y).unwrap();
        assert_relative_eq!(c.r, -1.0, epsilon = 1e-12);
        assert_relative_eq!(c.r_squared(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn symmetry() {
        let x = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0];
        let y = [0.3, 1.1, 0.2, 2.0, 1.6, 1.4];

        let a = pearson(&x, &y).unwrap();
        let b = pearson(&y, &x).unwrap();
        assert_relative_eq!(a.r, b.r, epsilon = 1e-14);
        assert_relative_eq!(a.p_value, b.p_value, epsilon = 1e-14);
    }

    #[test]
    fn r_squared_bounded() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 5.0];
        let c = pearson(&x, &y).unwrap();
        assert!((0.0..=1.0).contains(&c.r_squared()));
    }

    #[test]
    fn zero_covariance_gives_zero_r() {
        // x is symmetric about its mean and orthogonal to y
        let x = [1.0, -1.0, -1.0, 1.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let c = pearson(&x, &y).unwrap();
        assert_relative_eq!(c.r, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_variance_is_typed_error() {
        let x = [2.0, 2.0, 2.0, 2.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        assert!(matches!(pearson(&x, &y), Err(Error::ZeroVariance(_))));
        assert!(matches!(pearson(&y, &x), Err(Error::ZeroVariance(_))));
    }

    #[test]
    fn too_few_samples() {
        let x = [1.0, 2.0];
        let y = [2.0, 4.0];
        assert!(matches!(
            pearson(&x, &y),
            Err(Error::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn length_mismatch() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 4.0];
        assert!(pearson(&x, &y).is_err());
    }

    #[test]
    fn strong_correlation_is_significant() {
        let x: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 3.0 } else { -3.0 })
            .collect();

        let c = pearson(&x, &y).unwrap();
        assert!(c.r > 0.9);
        assert!(c.p_value < 1e-6);
    }

    #[test]
    fn normal_cdf_reference_points() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 0.002);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 0.002);
    }
}
