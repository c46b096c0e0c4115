//! Small numeric helpers for the engines.

/// Pearson correlation over the pairs where both values are finite.
///
/// Returns `None` when fewer than two complete pairs exist, when either side
/// has zero variance, or when the coefficient is not finite.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();

    let n = pairs.len();
    if n < 2 {
        return None;
    }

    // A constant side leaves rounding residue in its sum of squares.
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|p| p.0 == x0) || pairs.iter().all(|p| p.1 == y0) {
        return None;
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then_some(r)
}

/// Arithmetic mean of the finite values, `None` if there are none.
pub fn mean_finite(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Round to four decimal places.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_positive_and_negative() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_side_is_undefined() {
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
    }

    #[test]
    fn non_dyadic_constant_side_is_undefined() {
        for c in [5.33, 0.1, 1.1, 3.63, 0.07] {
            for n in [29, 30, 31, 32, 184] {
                let ramp: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin() + i as f64).collect();
                assert_eq!(pearson(&ramp, &vec![c; n]), None, "constant {c} x{n}");
                assert_eq!(pearson(&vec![c; n], &ramp), None, "constant {c} x{n}");
            }
        }
    }

    #[test]
    fn constant_after_dropping_incomplete_pairs_is_undefined() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!(pearson(&xs, &[9.0, 5.33, 5.33, 5.33]).is_some());
        assert_eq!(pearson(&xs, &[f64::NAN, 5.33, 5.33, 5.33]), None);
    }

    #[test]
    fn single_pair_is_undefined() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[], &[]), None);
    }

    #[test]
    fn incomplete_pairs_are_dropped() {
        let r = pearson(&[f64::NAN, 1.0, 2.0, 3.0], &[9.0, 1.0, 2.0, 3.0]).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_skips_nan() {
        assert_eq!(mean_finite(&[1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(mean_finite(&[f64::NAN]), None);
    }

    #[test]
    fn rounds_to_four_places() {
        assert_eq!(round4(-0.999_949), -0.9999);
        assert_eq!(round4(0.123_456), 0.1235);
    }
}
