/// Small numeric helpers shared by every engine component.
///
/// These mirror the conventions of the source market data: sample standard
/// deviation (n − 1), coefficient of variation as the inverse stability
/// signal, and plain least-squares fits over a time index.

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation. Zero for fewer than two points.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Standard deviation / mean. Zero when the mean is zero.
pub fn coefficient_of_variation(data: &[f64]) -> f64 {
    let m = mean(data);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(data) / m
}

/// Least-squares line over `y` with x = 0..n. Returns (slope, intercept).
/// Degenerate inputs (fewer than two points, zero x-variance) fit a flat line.
pub fn linear_fit(y: &[f64]) -> (f64, f64) {
    let n = y.len();
    if n < 2 {
        return (0.0, y.first().copied().unwrap_or(0.0));
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(y);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &yi) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (yi - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        return (0.0, y_mean);
    }
    let slope = num / den;
    (slope, y_mean - slope * x_mean)
}

/// Clamp a derived percentage onto [0, 100].
pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&data) - 5.0).abs() < 1e-9);
        // Sample std-dev of this classic series is ~2.138
        assert!((std_dev(&data) - 2.1380899).abs() < 1e-4);
    }

    #[test]
    fn test_std_dev_degenerate() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert_eq!(std_dev(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_cv_zero_mean() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_linear_fit_exact_line() {
        // y = 3x + 1
        let y = vec![1.0, 4.0, 7.0, 10.0];
        let (slope, intercept) = linear_fit(&y);
        assert!((slope - 3.0).abs() < 1e-9);
        assert!((intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_fit_rice_scenario() {
        // Net upward movement despite dips; extrapolation lands above the tail.
        let y = vec![100.0, 120.0, 110.0, 130.0, 125.0];
        let (slope, intercept) = linear_fit(&y);
        assert!((slope - 6.0).abs() < 1e-9);
        let next = intercept + slope * y.len() as f64;
        assert!(next > 125.0 && next < 140.0);
    }

    #[test]
    fn test_linear_fit_flat() {
        let (slope, intercept) = linear_fit(&[7.0, 7.0, 7.0]);
        assert_eq!(slope, 0.0);
        assert_eq!(intercept, 7.0);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert_eq!(clamp_percent(104.2), 100.0);
        assert_eq!(clamp_percent(55.5), 55.5);
    }
}
