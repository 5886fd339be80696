//! Expectation step: posterior component memberships and log-likelihood.
use crate::consts::LN_MIN_DENSITY;
use crate::data::Sample;
use crate::dist::ComponentParameters;
use crate::em::{EmError, UnderflowPolicy};
use crate::misc::reduce::map_chunks;
use crate::misc::{argmax, logaddexp};

/// N×2 table of posterior membership probabilities.
///
/// Row `i` holds (P(k=0 | x<sub>i</sub>), P(k=1 | x<sub>i</sub>)).
#[derive(Debug, Clone, PartialEq)]
pub struct Responsibilities {
    rows: Vec<[f64; 2]>,
}

impl Responsibilities {
    /// Wrap precomputed rows. Rows are not checked.
    pub fn from_rows(rows: Vec<[f64; 2]>) -> Self {
        Responsibilities { rows }
    }

    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn rows(&self) -> &[[f64; 2]] {
        &self.rows
    }

    /// # Panics
    /// If `ix` is out of bounds
    #[inline]
    pub fn row(&self, ix: usize) -> [f64; 2] {
        self.rows[ix]
    }

    /// Σ<sub>i</sub> r<sub>i,k</sub> for each component
    pub fn column_sums(&self) -> [f64; 2] {
        self.rows.iter().fold([0.0, 0.0], |[a, b], [r_0, r_1]| {
            [a + r_0, b + r_1]
        })
    }

    /// The most probable component of each observation. Ties go to
    /// component 0.
    pub fn assignments(&self) -> Vec<usize> {
        self.rows.iter().map(|row| argmax(row)).collect()
    }

    /// The same table with the component columns exchanged
    #[must_use]
    pub fn swapped(&self) -> Self {
        Responsibilities {
            rows: self.rows.iter().map(|&[r_0, r_1]| [r_1, r_0]).collect(),
        }
    }
}

/// Output of the E-step
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    /// Posterior memberships
    pub responsibilities: Responsibilities,
    /// Σ<sub>i</sub> ln f(x<sub>i</sub>) under the current mixture
    pub ln_likelihood: f64,
    /// Number of observations whose density was clamped
    pub n_clamped: usize,
}

struct ChunkExpectation {
    rows: Vec<[f64; 2]>,
    ln_likelihood: f64,
    n_clamped: usize,
}

/// Compute responsibilities and the log-likelihood of `sample` under
/// `params`.
///
/// Everything is evaluated in log space: with ln w<sub>i,k</sub> =
/// ln α<sub>k</sub> + ln N(x<sub>i</sub>; μ<sub>k</sub>, σ<sub>k</sub>), the
/// log-normalizer is logaddexp(ln w<sub>i,0</sub>, ln w<sub>i,1</sub>) and
/// r<sub>i,k</sub> = exp(ln w<sub>i,k</sub> − ln normalizer<sub>i</sub>).
///
/// A log-normalizer below [`LN_MIN_DENSITY`] counts as an underflow and is
/// handled according to `policy`.
///
/// # Example
///
/// ```
/// use emix::data::Sample;
/// use emix::dist::ComponentParameters;
/// use emix::em::{expectation, UnderflowPolicy};
///
/// let params = ComponentParameters::from_triples([
///     (0.0, 1.0, 0.5),
///     (4.0, 1.0, 0.5),
/// ])
/// .unwrap();
/// let xs = [0.0, 2.0, 4.0];
/// let sample = Sample::new(&xs).unwrap();
///
/// let exp = expectation(&sample, &params, UnderflowPolicy::Fail).unwrap();
/// let r = exp.responsibilities;
///
/// assert!(r.row(0)[0] > 0.99);
/// assert!((r.row(1)[0] - 0.5).abs() < 1E-12);
/// assert!(r.row(2)[1] > 0.99);
/// ```
pub fn expectation(
    sample: &Sample,
    params: &ComponentParameters,
    policy: UnderflowPolicy,
) -> Result<Expectation, EmError> {
    params.validate()?;

    let xs = sample.as_slice();
    let chunks = map_chunks(xs.len(), |range| {
        let offset = range.start;
        let mut chunk = ChunkExpectation {
            rows: Vec::with_capacity(range.len()),
            ln_likelihood: 0.0,
            n_clamped: 0,
        };

        for (i, &x) in xs[range].iter().enumerate() {
            let ln_w = params.ln_weighted_densities(x);
            let ln_norm = logaddexp(ln_w[0], ln_w[1]);

            // negated so that NaN also lands here
            if !(ln_norm >= LN_MIN_DENSITY) {
                let ix = offset + i;
                match policy {
                    UnderflowPolicy::Fail => {
                        return Err(EmError::NumericalUnderflow { ix, x });
                    }
                    UnderflowPolicy::Clamp => {
                        log::warn!(
                            "clamped mixture density at observation {ix} \
                             (x = {x}, ln f = {ln_norm})"
                        );
                        chunk.rows.push(clamped_row(params, ln_w, ln_norm));
                        chunk.ln_likelihood += LN_MIN_DENSITY;
                        chunk.n_clamped += 1;
                        continue;
                    }
                }
            }

            chunk
                .rows
                .push([(ln_w[0] - ln_norm).exp(), (ln_w[1] - ln_norm).exp()]);
            chunk.ln_likelihood += ln_norm;
        }

        Ok(chunk)
    });

    let mut rows = Vec::with_capacity(xs.len());
    let mut ln_likelihood = 0.0;
    let mut n_clamped = 0;
    for chunk in chunks {
        let chunk = chunk?;
        rows.extend(chunk.rows);
        ln_likelihood += chunk.ln_likelihood;
        n_clamped += chunk.n_clamped;
    }

    Ok(Expectation {
        responsibilities: Responsibilities { rows },
        ln_likelihood,
        n_clamped,
    })
}

/// Responsibilities of a clamped point. The exact log-space values are used
/// when they exist; if neither component has any density at the point the
/// mixing weights stand in.
fn clamped_row(
    params: &ComponentParameters,
    ln_w: [f64; 2],
    ln_norm: f64,
) -> [f64; 2] {
    if ln_norm.is_finite() {
        [(ln_w[0] - ln_norm).exp(), (ln_w[1] - ln_norm).exp()]
    } else {
        *params.weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::{ComponentParametersError, Gaussian, GaussianError};
    use crate::traits::HasDensity;
    use proptest::prelude::*;

    const TOL: f64 = 1E-12;

    fn params() -> ComponentParameters {
        ComponentParameters::from_triples([(0.0, 1.0, 0.3), (3.0, 0.5, 0.7)])
            .unwrap()
    }

    #[test]
    fn log_likelihood_is_sum_of_mixture_log_densities() {
        let xs = vec![-1.0, 0.0, 1.5, 2.9, 3.3];
        let sample = Sample::new(&xs).unwrap();
        let mm = params();
        let exp = expectation(&sample, &mm, UnderflowPolicy::Fail).unwrap();
        let expected: f64 = xs.iter().map(|x| mm.ln_f(x)).sum();
        assert::close(exp.ln_likelihood, expected, TOL);
        assert_eq!(exp.n_clamped, 0);
    }

    #[test]
    fn responsibilities_match_bayes_rule() {
        let xs = vec![1.0, 2.0];
        let sample = Sample::new(&xs).unwrap();
        let mm = params();
        let exp = expectation(&sample, &mm, UnderflowPolicy::Fail).unwrap();

        for (i, x) in xs.iter().enumerate() {
            let w_0 = 0.3 * mm.components()[0].f(x);
            let w_1 = 0.7 * mm.components()[1].f(x);
            let row = exp.responsibilities.row(i);
            assert::close(row[0], w_0 / (w_0 + w_1), TOL);
            assert::close(row[1], w_1 / (w_0 + w_1), TOL);
        }
    }

    #[test]
    fn expectation_is_deterministic() {
        let xs: Vec<f64> =
            (0..3000).map(|i| (i as f64 * 0.37).sin() * 4.0).collect();
        let sample = Sample::new(&xs).unwrap();
        let mm = params();
        let exp_1 = expectation(&sample, &mm, UnderflowPolicy::Fail).unwrap();
        let exp_2 = expectation(&sample, &mm, UnderflowPolicy::Fail).unwrap();
        assert_eq!(exp_1, exp_2);
        assert_eq!(
            exp_1.ln_likelihood.to_bits(),
            exp_2.ln_likelihood.to_bits()
        );
    }

    #[test]
    fn swapping_labels_swaps_columns() {
        let xs = vec![-0.5, 0.7, 2.2, 3.1];
        let sample = Sample::new(&xs).unwrap();
        let exp =
            expectation(&sample, &params(), UnderflowPolicy::Fail).unwrap();
        let exp_swapped =
            expectation(&sample, &params().swapped(), UnderflowPolicy::Fail)
                .unwrap();
        assert_eq!(exp.responsibilities.swapped(), exp_swapped.responsibilities);
        assert_eq!(exp.ln_likelihood, exp_swapped.ln_likelihood);
    }

    #[test]
    fn non_positive_sigma_is_invalid() {
        let xs = vec![0.0, 1.0];
        let sample = Sample::new(&xs).unwrap();
        let mm = ComponentParameters::new_unchecked(
            [0.5, 0.5],
            [Gaussian::standard(), Gaussian::new_unchecked(1.0, 0.0)],
        );
        assert_eq!(
            expectation(&sample, &mm, UnderflowPolicy::Fail),
            Err(EmError::InvalidParameter(
                ComponentParametersError::Component {
                    component: 1,
                    err: GaussianError::SigmaTooLow { sigma: 0.0 },
                }
            ))
        );
    }

    fn tight_params() -> ComponentParameters {
        ComponentParameters::from_triples([(0.0, 0.1, 0.5), (0.0, 0.1, 0.5)])
            .unwrap()
    }

    #[test]
    fn underflow_fails_under_fail_policy() {
        let xs = vec![0.0, 0.05, -0.05, 100.0];
        let sample = Sample::new(&xs).unwrap();
        assert_eq!(
            expectation(&sample, &tight_params(), UnderflowPolicy::Fail),
            Err(EmError::NumericalUnderflow { ix: 3, x: 100.0 })
        );
    }

    #[test]
    fn subnormal_density_counts_as_underflow() {
        let params =
            ComponentParameters::from_triples([(0.0, 1.0, 0.5), (0.0, 1.0, 0.5)])
                .unwrap();

        // ln f ≈ -699.9, a normal f64 density
        let xs = vec![0.0, 37.39];
        let sample = Sample::new(&xs).unwrap();
        let exp = expectation(&sample, &params, UnderflowPolicy::Fail).unwrap();
        assert!(exp.ln_likelihood > LN_MIN_DENSITY);

        // ln f ≈ -710.1, nonzero but subnormal
        let x = 37.66;
        assert!(params.f(&x) > 0.0);
        assert!(params.f(&x) < f64::MIN_POSITIVE);
        let xs = vec![0.0, x];
        let sample = Sample::new(&xs).unwrap();
        assert_eq!(
            expectation(&sample, &params, UnderflowPolicy::Fail),
            Err(EmError::NumericalUnderflow { ix: 1, x })
        );
    }

    #[test]
    fn underflow_is_floored_and_counted_under_clamp_policy() {
        let xs = vec![0.0, 0.05, -0.05, 100.0];
        let sample = Sample::new(&xs).unwrap();
        let mm = tight_params();
        let exp = expectation(&sample, &mm, UnderflowPolicy::Clamp).unwrap();

        assert_eq!(exp.n_clamped, 1);
        let expected = xs[..3].iter().map(|x| mm.ln_f(x)).sum::<f64>()
            + LN_MIN_DENSITY;
        assert::close(exp.ln_likelihood, expected, 1E-9);

        // ln f is about -5e5 here, so only ~1e-10 absolute precision remains
        let row = exp.responsibilities.row(3);
        assert::close(row[0], 0.5, 1E-9);
        assert::close(row[1], 0.5, 1E-9);
    }

    #[test]
    fn clamped_row_falls_back_to_weights_without_density() {
        let row = clamped_row(
            &params(),
            [f64::NEG_INFINITY, f64::NEG_INFINITY],
            f64::NEG_INFINITY,
        );
        assert_eq!(row, [0.3, 0.7]);
    }

    #[test]
    fn assignments_pick_most_probable_component() {
        let r = Responsibilities::from_rows(vec![
            [0.9, 0.1],
            [0.2, 0.8],
            [0.5, 0.5],
        ]);
        assert_eq!(r.assignments(), vec![0, 1, 0]);
        let sums = r.column_sums();
        assert::close(sums[0], 1.6, TOL);
        assert::close(sums[1], 1.4, TOL);
    }

    proptest! {
        #[test]
        fn rows_sum_to_one(
            xs in prop::collection::vec(-50.0..50.0_f64, 2..200),
            mu_0 in -10.0..10.0_f64,
            mu_1 in -10.0..10.0_f64,
            sigma_0 in 0.1..10.0_f64,
            sigma_1 in 0.1..10.0_f64,
            w_0 in 0.01..0.99_f64,
        ) {
            let mm = ComponentParameters::from_triples([
                (mu_0, sigma_0, w_0),
                (mu_1, sigma_1, 1.0 - w_0),
            ])
            .unwrap();
            let sample = Sample::new(&xs).unwrap();
            let exp = expectation(&sample, &mm, UnderflowPolicy::Clamp).unwrap();

            prop_assert_eq!(exp.responsibilities.len(), xs.len());
            for row in exp.responsibilities.rows() {
                prop_assert!(row[0] >= 0.0 && row[0] <= 1.0);
                prop_assert!(row[1] >= 0.0 && row[1] <= 1.0);
                prop_assert!((row[0] + row[1] - 1.0).abs() < 1E-9);
            }
        }
    }
}
