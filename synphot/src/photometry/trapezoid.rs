//! Trapezoidal quadrature over sampled, possibly non-uniform grids.

/// Integrate `y(x)` with the trapezoid rule over the sample points as given.
///
/// Samples are never resampled; the grid spacing is taken as-is. An empty or
/// single-point grid integrates to 0.0.
///
/// # Panics
/// If `x` and `y` have different lengths (a programming error, not a data error).
pub fn trap_integrate(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(
        x.len(),
        y.len(),
        "trapezoid integration needs matching x and y lengths"
    );

    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Integrate `f(x_i, y_i)` over the grid with the trapezoid rule.
pub fn trap_integrate_with<F>(x: &[f64], y: &[f64], f: F) -> f64
where
    F: Fn(f64, f64) -> f64,
{
    let weighted: Vec<f64> = x.iter().zip(y).map(|(&xi, &yi)| f(xi, yi)).collect();
    trap_integrate(x, &weighted)
}
