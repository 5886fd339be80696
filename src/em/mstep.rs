//! Maximization step: responsibility-weighted parameter estimates.
use crate::consts::COLLAPSE_FLOOR;
use crate::data::{Sample, WeightedGaussianSuffStat};
use crate::dist::{ComponentParameters, Gaussian};
use crate::em::{EmError, Responsibilities};
use crate::misc::reduce::fold_chunks;

/// Re-estimate the mixture from `responsibilities`.
///
/// For each component, N<sub>k</sub> = Σ<sub>i</sub> r<sub>i,k</sub>, the
/// mean is the r-weighted mean, the variance is the r-weighted mean squared
/// deviation from that mean (a second pass over the data), and
/// α<sub>k</sub> = N<sub>k</sub> / (N<sub>0</sub> + N<sub>1</sub>).
///
/// Fails with `CollapsedComponent` if N<sub>k</sub> ≤ N·ε. A zero variance
/// is not an error here; the resulting σ = 0 is rejected by the next E-step.
///
/// # Example
///
/// ```
/// use emix::data::Sample;
/// use emix::em::{maximization, Responsibilities};
///
/// let xs = [1.0, 3.0, 10.0, 14.0];
/// let sample = Sample::new(&xs).unwrap();
/// let r = Responsibilities::from_rows(vec![
///     [1.0, 0.0],
///     [1.0, 0.0],
///     [0.0, 1.0],
///     [0.0, 1.0],
/// ]);
///
/// let params = maximization(&sample, &r).unwrap();
/// assert_eq!(params.mu(0), 2.0);
/// assert_eq!(params.sigma(0), 1.0);
/// assert_eq!(params.mu(1), 12.0);
/// assert_eq!(params.sigma(1), 2.0);
/// assert_eq!(params.weights(), &[0.5, 0.5]);
/// ```
pub fn maximization(
    sample: &Sample,
    responsibilities: &Responsibilities,
) -> Result<ComponentParameters, EmError> {
    let xs = sample.as_slice();
    let rows = responsibilities.rows();
    if rows.len() != xs.len() {
        return Err(EmError::DimensionMismatch {
            n_data: xs.len(),
            n_rows: rows.len(),
        });
    }

    let stats: [WeightedGaussianSuffStat; 2] = fold_chunks(xs.len(), |range| {
        let mut stats = [WeightedGaussianSuffStat::new(); 2];
        xs[range.clone()]
            .iter()
            .zip(rows[range].iter())
            .for_each(|(&x, row)| {
                stats[0].observe(x, row[0]);
                stats[1].observe(x, row[1]);
            });
        stats
    });

    let floor = xs.len() as f64 * COLLAPSE_FLOOR;
    for (component, stat) in stats.iter().enumerate() {
        let n_eff = stat.n_eff();
        // negated so that NaN also lands here
        if !(n_eff > floor) {
            return Err(EmError::CollapsedComponent { component, n_eff });
        }
    }

    let means = [stats[0].mean(), stats[1].mean()];

    let sq_devs: [f64; 2] = fold_chunks(xs.len(), |range| {
        xs[range.clone()].iter().zip(rows[range].iter()).fold(
            [0.0, 0.0],
            |[a, b], (&x, row)| {
                [
                    a + WeightedGaussianSuffStat::sq_dev(x, row[0], means[0]),
                    b + WeightedGaussianSuffStat::sq_dev(x, row[1], means[1]),
                ]
            },
        )
    });

    let n_total = stats[0].n_eff() + stats[1].n_eff();
    let component = |k: usize| {
        let n_eff = stats[k].n_eff();
        let sigma = if sq_devs[k].is_finite() {
            (sq_devs[k] / n_eff).sqrt()
        } else {
            rescaled_sigma(xs, rows, k, means[k], n_eff)
        };
        Gaussian::new_unchecked(means[k], sigma)
    };

    Ok(ComponentParameters::new_unchecked(
        [stats[0].n_eff() / n_total, stats[1].n_eff() / n_total],
        [component(0), component(1)],
    ))
}

/// Weighted standard deviation of component `k` when the squared
/// deviations overflow. Halved deviations are divided by the largest one
/// before squaring.
fn rescaled_sigma(
    xs: &[f64],
    rows: &[[f64; 2]],
    k: usize,
    mean: f64,
    n_eff: f64,
) -> f64 {
    let half_dev = |x: f64| 0.5 * x - 0.5 * mean;
    let scale = xs
        .iter()
        .fold(0.0, |max: f64, &x| max.max(half_dev(x).abs()));

    let sum: f64 = fold_chunks(xs.len(), |range| {
        xs[range.clone()]
            .iter()
            .zip(rows[range].iter())
            .map(|(&x, row)| row[k] * (half_dev(x) / scale).powi(2))
            .sum::<f64>()
    });

    2.0 * scale * (sum / n_eff).sqrt()
}
