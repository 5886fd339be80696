use std::fmt;

use crate::data::SampleError;
use crate::dist::ComponentParametersError;
use crate::em::FitState;

/// Why an initial partition could not be turned into parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Degeneracy {
    /// A group has fewer than two members
    TooFewMembers { component: usize, n: usize },
    /// Every member of a group has the same value
    ZeroSpread { component: usize },
    /// The standard deviation of a group is too large to represent
    SpreadOverflow { component: usize },
    /// Every observation has the same value, so no second centroid exists
    IdenticalValues,
    /// A k-means cluster lost all of its members
    EmptyCluster,
    /// k-means++ could not weight the candidates for the second centroid
    KMeansSeeding,
}

/// Failures of the EM procedure
#[derive(Debug, Clone, PartialEq)]
pub enum EmError {
    /// The observations are unusable
    Sample(SampleError),
    /// The initial partition is unusable
    DegenerateInitialization(Degeneracy),
    /// Parameters handed to the E-step are invalid
    InvalidParameter(ComponentParametersError),
    /// The mixture density of the observation at `ix` underflowed
    NumericalUnderflow { ix: usize, x: f64 },
    /// The effective count of `component` vanished in the M-step
    CollapsedComponent { component: usize, n_eff: f64 },
    /// The responsibilities do not match the data
    DimensionMismatch { n_data: usize, n_rows: usize },
}

/// Invalid EM configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The convergence threshold is infinite or NaN
    TolNotFinite { tol: f64 },
    /// The convergence threshold is negative
    TolNegative { tol: f64 },
    /// The supplied initial parameters are invalid
    InitialParams(ComponentParametersError),
}

/// A fit that ended in failure.
///
/// Carries the last valid state, if the fit got far enough to produce one, so
/// the parameters and log-likelihood history up to the failure are not lost.
#[derive(Debug, Clone)]
pub struct FitFailure {
    error: EmError,
    last_state: Option<FitState>,
}

impl FitFailure {
    pub(crate) fn new(error: EmError, last_state: Option<FitState>) -> Self {
        FitFailure { error, last_state }
    }

    /// What went wrong
    pub fn error(&self) -> &EmError {
        &self.error
    }

    /// The last state produced before the failure. `None` if the fit failed
    /// during initialization.
    pub fn last_state(&self) -> Option<&FitState> {
        self.last_state.as_ref()
    }

    /// Log-likelihood history up to the failure
    pub fn history(&self) -> &[f64] {
        match &self.last_state {
            Some(state) => state.history(),
            None => &[],
        }
    }

    pub fn into_parts(self) -> (EmError, Option<FitState>) {
        (self.error, self.last_state)
    }
}

impl From<SampleError> for EmError {
    fn from(err: SampleError) -> Self {
        EmError::Sample(err)
    }
}

impl From<Degeneracy> for EmError {
    fn from(degeneracy: Degeneracy) -> Self {
        EmError::DegenerateInitialization(degeneracy)
    }
}

impl From<ComponentParametersError> for EmError {
    fn from(err: ComponentParametersError) -> Self {
        EmError::InvalidParameter(err)
    }
}

impl From<EmError> for FitFailure {
    fn from(error: EmError) -> Self {
        FitFailure::new(error, None)
    }
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewMembers { component, n } => write!(
                f,
                "group {component} has {n} members but at least 2 are required"
            ),
            Self::ZeroSpread { component } => {
                write!(f, "all members of group {component} are identical")
            }
            Self::SpreadOverflow { component } => write!(
                f,
                "the standard deviation of group {component} overflows"
            ),
            Self::IdenticalValues => write!(f, "all observations are identical"),
            Self::EmptyCluster => write!(f, "a k-means cluster became empty"),
            Self::KMeansSeeding => {
                write!(f, "k-means++ could not place the second centroid")
            }
        }
    }
}

impl std::error::Error for EmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sample(err) => Some(err),
            Self::InvalidParameter(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for EmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample(err) => write!(f, "invalid sample: {err}"),
            Self::DegenerateInitialization(degeneracy) => {
                write!(f, "degenerate initialization: {degeneracy}")
            }
            Self::InvalidParameter(err) => {
                write!(f, "invalid parameter: {err}")
            }
            Self::NumericalUnderflow { ix, x } => write!(
                f,
                "mixture density underflowed at observation {ix} ({x})"
            ),
            Self::CollapsedComponent { component, n_eff } => write!(
                f,
                "component {component} collapsed (effective count {n_eff})"
            ),
            Self::DimensionMismatch { n_data, n_rows } => write!(
                f,
                "{n_rows} responsibility rows for {n_data} observations"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InitialParams(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TolNotFinite { tol } => {
                write!(f, "non-finite convergence threshold: {tol}")
            }
            Self::TolNegative { tol } => {
                write!(f, "convergence threshold ({tol}) must not be negative")
            }
            Self::InitialParams(err) => {
                write!(f, "invalid initial parameters: {err}")
            }
        }
    }
}

impl std::error::Error for FitFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl fmt::Display for FitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_state {
            Some(state) => write!(
                f,
                "EM failed after {} iterations: {}",
                state.n_iters(),
                self.error
            ),
            None => write!(f, "EM failed during initialization: {}", self.error),
        }
    }
}
