/// Safely compute `ln(exp(a) + exp(b))`
///
/// # Example
///
/// ```rust
/// # use emix::misc::logaddexp;
/// let x = logaddexp(0.2_f64.ln(), 0.3_f64.ln());
/// assert!((x - 0.5_f64.ln()).abs() < 1E-12);
///
/// // does not underflow where the naive computation would
/// let y = logaddexp(-1000.0, -1000.0);
/// assert!((y - (-1000.0 + 2.0_f64.ln())).abs() < 1E-10);
/// ```
pub fn logaddexp(a: f64, b: f64) -> f64 {
    let maxval = a.max(b);
    if maxval == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else {
        maxval + (-(a - b).abs()).exp().ln_1p()
    }
}

/// Index of the largest element in `xs`. Ties go to the lowest index.
///
/// # Example
///
/// ```rust
/// # use emix::misc::argmax;
/// assert_eq!(argmax(&[0.2, 0.8]), 1);
/// assert_eq!(argmax(&[0.5, 0.5]), 0);
/// ```
pub fn argmax(xs: &[f64]) -> usize {
    xs.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(ix_max, max), (ix, &x)| {
            if x > max {
                (ix, x)
            } else {
                (ix_max, max)
            }
        })
        .0
}
