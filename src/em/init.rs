//! Initial parameter estimates from a hard two-way partition of the sample.
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::consts::KMEANS_MAX_ITERS;
use crate::data::Sample;
use crate::dist::{ComponentParameters, Gaussian, GaussianError};
use crate::em::{Degeneracy, EmError, Initialization};

/// Derive initial parameters for `sample` using `init`.
///
/// Partition-based methods order the components by ascending mean and use
/// the population standard deviation of each group.
///
/// # Example
///
/// ```
/// use emix::data::Sample;
/// use emix::em::{initialize, Initialization};
///
/// let xs = [0.0, 0.2, 0.1, 9.9, 10.0, 10.1];
/// let sample = Sample::new(&xs).unwrap();
/// let init = Initialization::KMeans { seed: 3 };
/// let params = initialize(&sample, &init).unwrap();
///
/// assert!((params.mu(0) - 0.1).abs() < 1E-12);
/// assert!((params.mu(1) - 10.0).abs() < 1E-12);
/// assert_eq!(params.weights(), &[0.5, 0.5]);
/// ```
pub fn initialize(
    sample: &Sample,
    init: &Initialization,
) -> Result<ComponentParameters, EmError> {
    match init {
        Initialization::KMeans { seed } => {
            let labels = kmeans_labels(sample, *seed)?;
            params_from_labels(sample, &labels)
        }
        Initialization::SortedHalves => {
            let labels = sorted_halves_labels(sample);
            params_from_labels(sample, &labels)
        }
        Initialization::Params(params) => {
            params.validate()?;
            Ok(params.clone())
        }
    }
}

/// Label each observation 0 or 1 by 1-D k-means with k-means++ seeding.
///
/// Lloyd rounds stop once no label changes or after `KMEANS_MAX_ITERS`
/// rounds. A point equidistant from both centroids goes to cluster 0.
pub fn kmeans_labels(sample: &Sample, seed: u64) -> Result<Vec<usize>, EmError> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let mut centroids = kmeans_pp_centroids(sample, &mut rng)?;

    let mut labels = assign(sample, &centroids);
    for _ in 0..KMEANS_MAX_ITERS {
        centroids = centroids_of(sample, &labels)?;
        let next = assign(sample, &centroids);
        if next == labels {
            break;
        }
        labels = next;
    }

    Ok(labels)
}

/// Label the lower ⌊N/2⌋ sorted observations 0 and the rest 1. Ties in
/// value are broken by position.
pub fn sorted_halves_labels(sample: &Sample) -> Vec<usize> {
    let xs = sample.as_slice();
    let mut ixs: Vec<usize> = (0..xs.len()).collect();
    ixs.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    let n_lower = xs.len() / 2;
    let mut labels = vec![1; xs.len()];
    ixs.iter().take(n_lower).for_each(|&ix| labels[ix] = 0);
    labels
}

fn kmeans_pp_centroids<R: Rng>(
    sample: &Sample,
    rng: &mut R,
) -> Result<[f64; 2], EmError> {
    let xs = sample.as_slice();
    let first = xs[rng.gen_range(0..xs.len())];

    // halved so the difference of two finite values stays finite
    let dists: Vec<f64> =
        xs.iter().map(|x| (0.5 * x - 0.5 * first).abs()).collect();
    let scale = dists.iter().fold(0.0, |max: f64, &d| max.max(d));
    if scale == 0.0 {
        return Err(Degeneracy::IdenticalValues.into());
    }

    // D² relative to the farthest point, so every weight is in [0, 1]
    let d2: Vec<f64> = dists.iter().map(|d| (d / scale).powi(2)).collect();
    if !d2.iter().sum::<f64>().is_finite() {
        return Err(Degeneracy::KMeansSeeding.into());
    }

    let dist = WeightedIndex::new(&d2).map_err(|err| match err {
        WeightedError::AllWeightsZero => Degeneracy::IdenticalValues,
        _ => Degeneracy::KMeansSeeding,
    })?;

    Ok([first, xs[dist.sample(rng)]])
}

fn assign(sample: &Sample, centroids: &[f64; 2]) -> Vec<usize> {
    sample
        .iter()
        .map(|x| {
            let d0 = (0.5 * x - 0.5 * centroids[0]).abs();
            let d1 = (0.5 * x - 0.5 * centroids[1]).abs();
            if d1 < d0 {
                1
            } else {
                0
            }
        })
        .collect()
}

fn centroids_of(sample: &Sample, labels: &[usize]) -> Result<[f64; 2], EmError> {
    let mut counts = [0_usize; 2];
    labels.iter().for_each(|&k| counts[k] += 1);
    if counts.contains(&0) {
        return Err(Degeneracy::EmptyCluster.into());
    }

    let mut centroids = [0.0; 2];
    sample.iter().zip(labels.iter()).for_each(|(&x, &k)| {
        centroids[k] += x / counts[k] as f64;
    });
    Ok(centroids)
}

/// Per-group mean, population standard deviation and size / N
fn params_from_labels(
    sample: &Sample,
    labels: &[usize],
) -> Result<ComponentParameters, EmError> {
    let n = sample.len() as f64;
    let group_params = |component: usize| -> Result<(Gaussian, f64), EmError> {
        let members: Vec<f64> = sample
            .iter()
            .zip(labels.iter())
            .filter(|(_, &k)| k == component)
            .map(|(&x, _)| x)
            .collect();

        let n_k = members.len();
        if n_k < 2 {
            return Err(Degeneracy::TooFewMembers { component, n: n_k }.into());
        }

        let nf = n_k as f64;
        let mean = members.iter().map(|x| x / nf).sum::<f64>();

        // halved deviations, scaled by the largest one before squaring
        let devs: Vec<f64> =
            members.iter().map(|x| 0.5 * x - 0.5 * mean).collect();
        let scale = devs.iter().fold(0.0, |max: f64, d| max.max(d.abs()));
        if scale == 0.0 {
            return Err(Degeneracy::ZeroSpread { component }.into());
        }
        let rel_var =
            devs.iter().map(|d| (d / scale).powi(2)).sum::<f64>() / nf;
        let sigma = 2.0 * scale * rel_var.sqrt();

        let gauss = Gaussian::new(mean, sigma).map_err(|err| match err {
            GaussianError::SigmaNotFinite { .. } => {
                Degeneracy::SpreadOverflow { component }
            }
            _ => Degeneracy::ZeroSpread { component },
        })?;

        Ok((gauss, nf / n))
    };

    let (gauss_0, w_0) = group_params(0)?;
    let (gauss_1, w_1) = group_params(1)?;
    let params =
        ComponentParameters::new_unchecked([w_0, w_1], [gauss_0, gauss_1])
            .sorted_by_mean();

    log::trace!("initial parameters: {params}");
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::ComponentParametersError;

    const TOL: f64 = 1E-12;

    fn two_clusters() -> Vec<f64> {
        vec![10.2, 0.1, 9.8, -0.1, 10.0, 0.0, 0.05, 9.95]
    }

    #[test]
    fn kmeans_separates_clusters() {
        let xs = two_clusters();
        let sample = Sample::new(&xs).unwrap();
        for seed in 0..20 {
            let labels = kmeans_labels(&sample, seed).unwrap();
            let low = labels[1];
            assert_ne!(labels[0], low);
            for (x, k) in xs.iter().zip(labels.iter()) {
                assert_eq!(*x < 5.0, *k == low);
            }
        }
    }

    #[test]
    fn kmeans_is_deterministic_per_seed() {
        let xs: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64).collect();
        let sample = Sample::new(&xs).unwrap();
        assert_eq!(
            kmeans_labels(&sample, 42).unwrap(),
            kmeans_labels(&sample, 42).unwrap()
        );
    }

    #[test]
    fn kmeans_params_are_group_statistics() {
        let xs = two_clusters();
        let sample = Sample::new(&xs).unwrap();
        let params =
            initialize(&sample, &Initialization::KMeans { seed: 1 }).unwrap();

        // lower group: 0.1, -0.1, 0.0, 0.05
        let mean_0 = 0.05 / 4.0;
        let var_0 = [0.1, -0.1, 0.0, 0.05]
            .iter()
            .map(|x: &f64| (x - mean_0).powi(2))
            .sum::<f64>()
            / 4.0;

        assert::close(params.mu(0), mean_0, TOL);
        assert::close(params.sigma(0), var_0.sqrt(), TOL);
        assert::close(params.mu(1), 9.9875, TOL);
        assert_eq!(params.weights(), &[0.5, 0.5]);
    }

    #[test]
    fn identical_values_are_degenerate() {
        let xs = vec![3.0; 10];
        let sample = Sample::new(&xs).unwrap();
        assert_eq!(
            initialize(&sample, &Initialization::KMeans { seed: 0 }),
            Err(EmError::DegenerateInitialization(Degeneracy::IdenticalValues))
        );
    }

    #[test]
    fn singleton_group_is_degenerate() {
        let xs = vec![0.0, 0.1, 0.2, 0.15, 100.0];
        let sample = Sample::new(&xs).unwrap();
        assert!(matches!(
            initialize(&sample, &Initialization::KMeans { seed: 5 }),
            Err(EmError::DegenerateInitialization(
                Degeneracy::TooFewMembers { n: 1, .. }
            ))
        ));
    }

    #[test]
    fn zero_spread_group_is_degenerate() {
        let xs = vec![0.0, 0.0, 0.0, 5.0, 5.5, 6.0];
        let sample = Sample::new(&xs).unwrap();
        assert!(matches!(
            initialize(&sample, &Initialization::SortedHalves),
            Err(EmError::DegenerateInitialization(Degeneracy::ZeroSpread {
                component: 0
            }))
        ));
    }

    #[test]
    fn two_points_cannot_be_split_into_pairs() {
        let xs = vec![1.0, 2.0];
        let sample = Sample::new(&xs).unwrap();
        assert!(matches!(
            initialize(&sample, &Initialization::SortedHalves),
            Err(EmError::DegenerateInitialization(
                Degeneracy::TooFewMembers { .. }
            ))
        ));
    }

    #[test]
    fn sorted_halves_split() {
        let xs = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        let sample = Sample::new(&xs).unwrap();
        assert_eq!(sorted_halves_labels(&sample), vec![1, 0, 1, 0, 1]);

        let params = initialize(&sample, &Initialization::SortedHalves).unwrap();
        assert::close(params.mu(0), 1.5, TOL);
        assert::close(params.sigma(0), 0.5, TOL);
        assert::close(params.weight(0), 0.4, TOL);
        assert::close(params.mu(1), 4.0, TOL);
        assert::close(params.sigma(1), (2.0_f64 / 3.0).sqrt(), TOL);
        assert::close(params.weight(1), 0.6, TOL);
    }

    fn huge_clusters() -> Vec<f64> {
        vec![-1E200, -0.9E200, -0.95E200, 0.9E200, 1E200, 0.95E200]
    }

    #[test]
    fn kmeans_handles_huge_magnitudes() {
        let xs = huge_clusters();
        let sample = Sample::new(&xs).unwrap();
        let sigma = 1E200 * (0.005_f64 / 3.0).sqrt();
        for seed in 0..20 {
            let params =
                initialize(&sample, &Initialization::KMeans { seed }).unwrap();
            assert::close(params.mu(0) / 1E200, -0.95, TOL);
            assert::close(params.mu(1) / 1E200, 0.95, TOL);
            assert::close(params.sigma(0) / sigma, 1.0, TOL);
            assert::close(params.sigma(1) / sigma, 1.0, TOL);
            assert_eq!(params.weights(), &[0.5, 0.5]);
        }
    }

    #[test]
    fn kmeans_seeding_handles_huge_magnitudes() {
        let xs = vec![-1E160, -0.9E160, -0.95E160, 0.9E160, 1E160, 0.95E160];
        let sample = Sample::new(&xs).unwrap();
        for seed in 0..20 {
            let labels = kmeans_labels(&sample, seed).unwrap();
            assert_eq!(labels[0], labels[1]);
            assert_eq!(labels[0], labels[2]);
            assert_eq!(labels[3], labels[4]);
            assert_eq!(labels[3], labels[5]);
            assert_ne!(labels[0], labels[3]);
        }
    }

    #[test]
    fn sorted_halves_spread_of_huge_values() {
        let xs = huge_clusters();
        let sample = Sample::new(&xs).unwrap();
        let params = initialize(&sample, &Initialization::SortedHalves).unwrap();
        let sigma = 1E200 * (0.005_f64 / 3.0).sqrt();
        assert::close(params.sigma(0) / sigma, 1.0, TOL);
        assert::close(params.sigma(1) / sigma, 1.0, TOL);
    }

    #[test]
    fn spread_near_the_largest_float_stays_finite() {
        let xs = vec![-f64::MAX, -1.0, 0.0, 1.0, 2.0, f64::MAX];
        let sample = Sample::new(&xs).unwrap();
        let params = initialize(&sample, &Initialization::SortedHalves).unwrap();
        // each group is one extreme value and two negligible ones
        let sigma = f64::MAX / 3.0 * 2.0_f64.sqrt();
        assert::close(params.sigma(0) / sigma, 1.0, 1E-12);
        assert::close(params.sigma(1) / sigma, 1.0, 1E-12);
    }

    #[test]
    fn extreme_values_do_not_overflow_kmeans() {
        let xs = vec![-f64::MAX, -0.9 * f64::MAX, 0.9 * f64::MAX, f64::MAX];
        let sample = Sample::new(&xs).unwrap();
        for seed in 0..10 {
            let labels = kmeans_labels(&sample, seed).unwrap();
            assert_eq!(labels[0], labels[1]);
            assert_eq!(labels[2], labels[3]);
            assert_ne!(labels[0], labels[2]);
        }
    }

    #[test]
    fn degeneracy_messages() {
        assert_eq!(
            Degeneracy::SpreadOverflow { component: 1 }.to_string(),
            "the standard deviation of group 1 overflows"
        );
        assert_eq!(
            Degeneracy::KMeansSeeding.to_string(),
            "k-means++ could not place the second centroid"
        );
    }

    #[test]
    fn explicit_params_pass_through() {
        let xs = vec![1.0, 2.0];
        let sample = Sample::new(&xs).unwrap();
        let params =
            ComponentParameters::from_triples([(5.0, 1.0, 0.5), (-5.0, 2.0, 0.5)])
                .unwrap();
        // explicit parameters keep their order
        assert_eq!(
            initialize(&sample, &Initialization::Params(params.clone())),
            Ok(params)
        );
    }

    #[test]
    fn invalid_explicit_params_are_rejected() {
        let xs = vec![1.0, 2.0];
        let sample = Sample::new(&xs).unwrap();
        let params = ComponentParameters::new_unchecked(
            [0.5, 0.5],
            [Gaussian::new_unchecked(0.0, 0.0), Gaussian::standard()],
        );
        assert!(matches!(
            initialize(&sample, &Initialization::Params(params)),
            Err(EmError::InvalidParameter(
                ComponentParametersError::Component { component: 0, .. }
            ))
        ));
    }
}
