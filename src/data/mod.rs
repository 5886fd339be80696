//! Data utilities
mod stat;

pub use self::stat::WeightedGaussianSuffStat;

use std::fmt;

/// A validated, borrowed view of the observations.
///
/// Holds at least two finite values. The underlying slice is never copied, so
/// several fits may share one `Sample`.
///
/// # Example
///
/// ```
/// use emix::data::{Sample, SampleError};
///
/// let xs = vec![0.1, 0.4, 2.2];
/// let sample = Sample::new(&xs).unwrap();
/// assert_eq!(sample.len(), 3);
///
/// assert_eq!(
///     Sample::new(&[1.0]),
///     Err(SampleError::TooFewObservations { n: 1 })
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    xs: &'a [f64],
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleError {
    /// Fewer than two observations
    TooFewObservations { n: usize },
    /// The observation at `ix` is infinite or NaN
    NonFiniteDatum { ix: usize, x: f64 },
}

impl<'a> Sample<'a> {
    /// The minimum number of observations a sample must hold
    pub const MIN_LEN: usize = 2;

    pub fn new(xs: &'a [f64]) -> Result<Self, SampleError> {
        if xs.len() < Self::MIN_LEN {
            return Err(SampleError::TooFewObservations { n: xs.len() });
        }

        match xs.iter().position(|x| !x.is_finite()) {
            Some(ix) => Err(SampleError::NonFiniteDatum { ix, x: xs[ix] }),
            None => Ok(Sample { xs }),
        }
    }

    /// Number of observations
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [f64] {
        self.xs
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'a, f64> {
        self.xs.iter()
    }
}

impl<'a> TryFrom<&'a [f64]> for Sample<'a> {
    type Error = SampleError;

    fn try_from(xs: &'a [f64]) -> Result<Self, Self::Error> {
        Sample::new(xs)
    }
}

impl<'a> TryFrom<&'a Vec<f64>> for Sample<'a> {
    type Error = SampleError;

    fn try_from(xs: &'a Vec<f64>) -> Result<Self, Self::Error> {
        Sample::new(xs.as_slice())
    }
}

impl std::error::Error for SampleError {}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewObservations { n } => write!(
                f,
                "sample has {n} observations but at least {} are required",
                Sample::MIN_LEN
            ),
            Self::NonFiniteDatum { ix, x } => {
                write!(f, "observation {ix} is not finite: {x}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_is_rejected() {
        assert_eq!(
            Sample::new(&[]),
            Err(SampleError::TooFewObservations { n: 0 })
        );
    }

    #[test]
    fn two_observations_are_enough() {
        let xs = [1.0, 2.0];
        let sample = Sample::new(&xs).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.as_slice(), &xs);
    }

    #[test]
    fn non_finite_observations_are_rejected() {
        let xs = vec![1.0, 2.0, f64::INFINITY, f64::NAN];
        assert!(matches!(
            Sample::try_from(&xs),
            Err(SampleError::NonFiniteDatum { ix: 2, .. })
        ));
    }

    #[test]
    fn sample_borrows_without_copying() {
        let xs = vec![1.0, 2.0, 3.0];
        let sample = Sample::try_from(&xs).unwrap();
        assert!(std::ptr::eq(sample.as_slice().as_ptr(), xs.as_ptr()));
    }
}
