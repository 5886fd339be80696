#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_ITERS, DEFAULT_TOL};
use crate::dist::ComponentParameters;
use crate::em::ConfigError;

/// What the E-step does when a point's mixture density underflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum UnderflowPolicy {
    /// Fail with `EmError::NumericalUnderflow` for the first observation
    /// whose mixture log-density is below `LN_MIN_DENSITY`,
    /// ln(f64::MIN_POSITIVE) ≈ -708.4. Densities that would only be
    /// representable as subnormals count as underflowed.
    #[default]
    Fail,
    /// Floor the point's log-likelihood contribution at `LN_MIN_DENSITY`,
    /// count it, and carry on. Responsibilities keep their exact log-space
    /// values.
    Clamp,
}

/// How the initial parameters are chosen
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum Initialization {
    /// Seeded 1-D k-means with k = 2
    KMeans { seed: u64 },
    /// Split the sorted sample into a lower and an upper half
    SortedHalves,
    /// Start from the given parameters
    Params(ComponentParameters),
}

impl Default for Initialization {
    fn default() -> Self {
        Initialization::KMeans { seed: 0 }
    }
}

/// Configuration of an EM fit
///
/// # Example
///
/// ```
/// use emix::em::{EmConfig, Initialization, UnderflowPolicy};
///
/// let config = EmConfig::default()
///     .with_tol(1E-8)
///     .with_max_iters(500)
///     .with_underflow(UnderflowPolicy::Clamp)
///     .with_init(Initialization::SortedHalves);
///
/// assert_eq!(config.max_iters, 500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case", default))]
pub struct EmConfig {
    /// Convergence threshold on the absolute change in log-likelihood
    pub tol: f64,
    /// Maximum number of EM iterations
    pub max_iters: usize,
    /// Underflow handling in the E-step
    pub underflow: UnderflowPolicy,
    /// Initialization method
    pub init: Initialization,
}

impl Default for EmConfig {
    fn default() -> Self {
        EmConfig {
            tol: DEFAULT_TOL,
            max_iters: DEFAULT_MAX_ITERS,
            underflow: UnderflowPolicy::default(),
            init: Initialization::default(),
        }
    }
}

impl EmConfig {
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    #[must_use]
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    #[must_use]
    pub fn with_underflow(mut self, underflow: UnderflowPolicy) -> Self {
        self.underflow = underflow;
        self
    }

    #[must_use]
    pub fn with_init(mut self, init: Initialization) -> Self {
        self.init = init;
        self
    }

    /// Shorthand for k-means initialization with the given seed
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_init(Initialization::KMeans { seed })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tol.is_finite() {
            return Err(ConfigError::TolNotFinite { tol: self.tol });
        }
        if self.tol < 0.0 {
            return Err(ConfigError::TolNegative { tol: self.tol });
        }
        if let Initialization::Params(params) = &self.init {
            params.validate().map_err(ConfigError::InitialParams)?;
        }
        Ok(())
    }
}
