//! Piecewise interpolation of sampled curves with zero fill outside the samples.
//!
//! Supported kinds:
//!
//! - **Linear** (default): straight segments between neighbouring samples
//! - **Nearest**: value of the closest sample, ties resolved towards the lower sample
//! - **Slinear / Quadratic / Cubic**: interpolating splines of order 1, 2 and 3;
//!   the cubic uses not-a-knot ends and the quadratic is a C¹ B-spline
//!
//! Every kind returns exactly 0.0 for abscissae outside `[x_first, x_last]`.
//! A filter passes no light outside its sampled support, so out-of-range
//! lookups are neither extrapolated nor treated as errors.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors that can occur while building an interpolator
#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("{kind} interpolation needs at least {needed} points, got {got}")]
    InsufficientData {
        kind: InterpolationKind,
        needed: usize,
        got: usize,
    },

    #[error("Input vectors must have the same length ({0} vs {1})")]
    MismatchedLengths(usize, usize),

    #[error("X values must be finite and sorted in strictly ascending order")]
    UnsortedData,

    #[error("Unknown interpolation kind '{0}'; use linear, nearest, slinear, quadratic, cubic or a spline order 1-3")]
    UnknownKind(String),
}

/// Interpolation scheme used between samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpolationKind {
    #[default]
    Linear,
    Nearest,
    Slinear,
    Quadratic,
    Cubic,
}

impl InterpolationKind {
    /// Spline kind for a polynomial order in 1..=3.
    pub fn from_order(order: u8) -> Result<Self, InterpolationError> {
        match order {
            1 => Ok(InterpolationKind::Slinear),
            2 => Ok(InterpolationKind::Quadratic),
            3 => Ok(InterpolationKind::Cubic),
            other => Err(InterpolationError::UnknownKind(other.to_string())),
        }
    }

    /// Minimum number of samples this kind can interpolate.
    pub fn min_points(self) -> usize {
        match self {
            InterpolationKind::Nearest => 1,
            InterpolationKind::Linear | InterpolationKind::Slinear => 2,
            InterpolationKind::Quadratic => 3,
            InterpolationKind::Cubic => 4,
        }
    }

    pub fn check_len(self, n: usize) -> Result<(), InterpolationError> {
        if n < self.min_points() {
            return Err(InterpolationError::InsufficientData {
                kind: self,
                needed: self.min_points(),
                got: n,
            });
        }
        Ok(())
    }
}

impl fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterpolationKind::Linear => "linear",
            InterpolationKind::Nearest => "nearest",
            InterpolationKind::Slinear => "slinear",
            InterpolationKind::Quadratic => "quadratic",
            InterpolationKind::Cubic => "cubic",
        };
        f.write_str(name)
    }
}

impl FromStr for InterpolationKind {
    type Err = InterpolationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(InterpolationKind::Linear),
            "nearest" => Ok(InterpolationKind::Nearest),
            "slinear" | "1" => Ok(InterpolationKind::Slinear),
            "quadratic" | "2" => Ok(InterpolationKind::Quadratic),
            "cubic" | "3" => Ok(InterpolationKind::Cubic),
            other => Err(InterpolationError::UnknownKind(other.to_string())),
        }
    }
}

/// Solve a tridiagonal system in place with the Thomas algorithm.
///
/// `sub[0]` and `sup[n - 1]` are ignored.
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &mut [f64]) {
    let n = diag.len();
    let mut c = vec![0.0; n];
    for i in 0..n {
        let lower = if i > 0 { sub[i] } else { 0.0 };
        let prev_c = if i > 0 { c[i - 1] } else { 0.0 };
        let prev_r = if i > 0 { rhs[i - 1] } else { 0.0 };
        let denom = diag[i] - lower * prev_c;
        c[i] = if i + 1 < n { sup[i] / denom } else { 0.0 };
        rhs[i] = (rhs[i] - lower * prev_r) / denom;
    }
    for i in (0..n.saturating_sub(1)).rev() {
        rhs[i] -= c[i] * rhs[i + 1];
    }
}

/// Cubic spline with not-a-knot ends.
///
/// The third derivative is continuous across the second and the
/// second-to-last sample, so four samples of a cubic give back that cubic.
/// Each segment stores `a + b·dx + c·dx² + d·dx³`.
#[derive(Debug, Clone)]
struct CubicSpline {
    coeffs: Vec<[f64; 4]>,
}

impl CubicSpline {
    /// Needs at least four strictly ascending samples.
    fn new(x: &[f64], y: &[f64]) -> Self {
        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // Second derivatives M[1..n-1]; the end values are eliminated
        // through the not-a-knot conditions.
        let m = n - 2;
        let mut sub = vec![0.0; m];
        let mut diag = vec![0.0; m];
        let mut sup = vec![0.0; m];
        let mut rhs = vec![0.0; m];
        for i in 1..n - 1 {
            sub[i - 1] = h[i - 1];
            diag[i - 1] = 2.0 * (h[i - 1] + h[i]);
            sup[i - 1] = h[i];
            rhs[i - 1] =
                6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        let (h0, h1) = (h[0], h[1]);
        diag[0] += h0 * (h0 + h1) / h1;
        sup[0] -= h0 * h0 / h1;

        let (hp, hl) = (h[n - 3], h[n - 2]);
        diag[m - 1] += hl * (hp + hl) / hp;
        sub[m - 1] -= hl * hl / hp;

        solve_tridiagonal(&sub, &diag, &sup, &mut rhs);

        let first = ((h0 + h1) * rhs[0] - h0 * rhs[1]) / h1;
        let last = ((hp + hl) * rhs[m - 1] - hl * rhs[m - 2]) / hp;
        let mut second = Vec::with_capacity(n);
        second.push(first);
        second.extend_from_slice(&rhs);
        second.push(last);

        let coeffs = (0..n - 1)
            .map(|i| {
                let b = (y[i + 1] - y[i]) / h[i] - h[i] * (2.0 * second[i] + second[i + 1]) / 6.0;
                let d = (second[i + 1] - second[i]) / (6.0 * h[i]);
                [y[i], b, second[i] / 2.0, d]
            })
            .collect();
        Self { coeffs }
    }

    fn evaluate_segment(&self, segment: usize, dx: f64) -> f64 {
        let [a, b, c, d] = self.coeffs[segment];
        a + b * dx + c * dx * dx + d * dx * dx * dx
    }
}

/// Interpolating quadratic B-spline.
///
/// Interior knots sit at the midpoints between samples, leaving out the
/// first and last midpoint, so the spline has one coefficient per sample
/// and a continuous first derivative.
#[derive(Debug, Clone)]
struct QuadraticSpline {
    knots: Vec<f64>,
    coeffs: Vec<f64>,
}

impl QuadraticSpline {
    /// Needs at least three strictly ascending samples.
    fn new(x: &[f64], y: &[f64]) -> Self {
        let n = x.len();
        let mut knots = Vec::with_capacity(n + 3);
        knots.extend_from_slice(&[x[0]; 3]);
        knots.extend((1..n - 2).map(|i| 0.5 * (x[i] + x[i + 1])));
        knots.extend_from_slice(&[x[n - 1]; 3]);

        let mut spline = Self {
            knots,
            coeffs: Vec::new(),
        };

        // Clamped ends pin the outer coefficients to the end samples; the
        // collocation rows for the interior samples are then tridiagonal.
        let m = n - 2;
        let mut sub = vec![0.0; m];
        let mut diag = vec![0.0; m];
        let mut sup = vec![0.0; m];
        let mut rhs = vec![0.0; m];
        for i in 1..n - 1 {
            let row = i - 1;
            let (span, basis) = spline.basis(x[i]);
            rhs[row] = y[i];
            for (r, value) in basis.iter().enumerate() {
                let col = span - 2 + r;
                if col == 0 {
                    rhs[row] -= value * y[0];
                } else if col == n - 1 {
                    rhs[row] -= value * y[n - 1];
                } else if col + 1 == i {
                    sub[row] = *value;
                } else if col == i {
                    diag[row] = *value;
                } else {
                    sup[row] = *value;
                }
            }
        }
        solve_tridiagonal(&sub, &diag, &sup, &mut rhs);

        spline.coeffs.push(y[0]);
        spline.coeffs.extend_from_slice(&rhs);
        spline.coeffs.push(y[n - 1]);
        spline
    }

    /// Knot span containing `x` and the three non-zero basis values there.
    fn basis(&self, x: f64) -> (usize, [f64; 3]) {
        let t = &self.knots;
        let n = t.len() - 3;
        let span = 2 + t[3..n].partition_point(|&k| k <= x);

        let mut values = [1.0, 0.0, 0.0];
        let mut left = [0.0; 3];
        let mut right = [0.0; 3];
        for j in 1..=2 {
            left[j] = x - t[span + 1 - j];
            right[j] = t[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = values[r] / (right[r + 1] + left[j - r]);
                values[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            values[j] = saved;
        }
        (span, values)
    }

    fn evaluate(&self, x: f64) -> f64 {
        let (span, basis) = self.basis(x);
        basis
            .iter()
            .enumerate()
            .map(|(r, b)| b * self.coeffs[span - 2 + r])
            .sum()
    }
}

/// Interpolating function over fixed samples.
#[derive(Debug, Clone)]
pub struct Interpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    kind: InterpolationKind,
    cubic: Option<CubicSpline>,
    quadratic: Option<QuadraticSpline>,
}

impl Interpolator {
    /// Build an interpolator after validating the samples.
    ///
    /// # Errors
    /// - `MismatchedLengths` if `xs` and `ys` differ in length
    /// - `InsufficientData` if there are too few samples for `kind`
    /// - `UnsortedData` if `xs` is not finite and strictly ascending
    pub fn new(
        xs: Vec<f64>,
        ys: Vec<f64>,
        kind: InterpolationKind,
    ) -> Result<Self, InterpolationError> {
        if xs.len() != ys.len() {
            return Err(InterpolationError::MismatchedLengths(xs.len(), ys.len()));
        }
        kind.check_len(xs.len())?;
        if xs.iter().any(|x| !x.is_finite()) || xs.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(InterpolationError::UnsortedData);
        }
        Ok(Self::from_validated(xs, ys, kind))
    }

    /// Build from samples the caller has already validated.
    pub(crate) fn from_validated(xs: Vec<f64>, ys: Vec<f64>, kind: InterpolationKind) -> Self {
        let cubic = (kind == InterpolationKind::Cubic).then(|| CubicSpline::new(&xs, &ys));
        let quadratic =
            (kind == InterpolationKind::Quadratic).then(|| QuadraticSpline::new(&xs, &ys));
        Self {
            xs,
            ys,
            kind,
            cubic,
            quadratic,
        }
    }

    pub fn kind(&self) -> InterpolationKind {
        self.kind
    }

    /// Evaluate at `x`; 0.0 outside the sampled range.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let first = self.xs[0];
        let last = self.xs[n - 1];

        // Negated comparison so NaN also falls out of range
        if !(x >= first && x <= last) {
            return 0.0;
        }
        if n == 1 {
            return self.ys[0];
        }

        let segment = self.xs.partition_point(|&v| v <= x).saturating_sub(1).min(n - 2);
        let x1 = self.xs[segment];
        let x2 = self.xs[segment + 1];
        let y1 = self.ys[segment];
        let y2 = self.ys[segment + 1];

        match self.kind {
            InterpolationKind::Linear | InterpolationKind::Slinear => {
                let t = (x - x1) / (x2 - x1);
                y1 * (1.0 - t) + y2 * t
            }
            InterpolationKind::Nearest => {
                if x - x1 <= x2 - x {
                    y1
                } else {
                    y2
                }
            }
            InterpolationKind::Quadratic => match &self.quadratic {
                Some(spline) => spline.evaluate(x),
                None => y1 + (y2 - y1) * (x - x1) / (x2 - x1),
            },
            InterpolationKind::Cubic => match &self.cubic {
                Some(spline) => spline.evaluate_segment(segment, x - x1),
                None => y1 + (y2 - y1) * (x - x1) / (x2 - x1),
            },
        }
    }

    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }
}
