//! Two-component univariate Gaussian mixture
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use rand::Rng;
use std::fmt;

use crate::consts::WEIGHT_SUM_TOL;
use crate::dist::{Gaussian, GaussianError};
use crate::impl_display;
use crate::misc::logaddexp;
use crate::traits::{HasDensity, Sampleable};

/// Parameters of a two-component Gaussian mixture,
///
/// f(x) = α<sub>0</sub> N(x; μ<sub>0</sub>, σ<sub>0</sub>) +
///        α<sub>1</sub> N(x; μ<sub>1</sub>, σ<sub>1</sub>)
///
/// Component labels carry no meaning; [`ComponentParameters::swapped`] gives
/// the same mixture with the labels exchanged.
///
/// # Example
///
/// ```
/// use emix::dist::{ComponentParameters, Gaussian};
/// use emix::traits::HasDensity;
///
/// let mm = ComponentParameters::new(
///     [0.3, 0.7],
///     [Gaussian::new(0.0, 1.0).unwrap(), Gaussian::new(5.0, 2.0).unwrap()],
/// )
/// .unwrap();
///
/// assert_eq!(mm.weight(1), 0.7);
/// assert!((mm.f(&1.0) - mm.swapped().f(&1.0)).abs() < 1E-14);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ComponentParameters {
    /// Mixing weights, α
    weights: [f64; 2],
    /// Component distributions
    components: [Gaussian; 2],
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum ComponentParametersError {
    /// A component Gaussian is invalid
    Component {
        component: usize,
        err: GaussianError,
    },
    /// A weight is not in (0, 1)
    WeightOutOfRange { component: usize, weight: f64 },
    /// The weights do not sum to one
    WeightsDoNotSumToOne { sum: f64 },
}

impl ComponentParameters {
    /// Create a mixture from weights and components, checking that every
    /// component is a valid Gaussian, each weight is in (0, 1), and the
    /// weights sum to one.
    pub fn new(
        weights: [f64; 2],
        components: [Gaussian; 2],
    ) -> Result<Self, ComponentParametersError> {
        let mm = Self::new_unchecked(weights, components);
        mm.validate()?;
        Ok(mm)
    }

    /// Create a mixture without checking the parameters
    #[inline]
    #[must_use]
    pub fn new_unchecked(weights: [f64; 2], components: [Gaussian; 2]) -> Self {
        ComponentParameters {
            weights,
            components,
        }
    }

    /// Build from `(μ, σ, α)` triples
    ///
    /// # Example
    ///
    /// ```
    /// # use emix::dist::ComponentParameters;
    /// let mm = ComponentParameters::from_triples([
    ///     (0.0, 1.0, 0.5),
    ///     (3.0, 0.5, 0.5),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(mm.mu(1), 3.0);
    /// assert!(ComponentParameters::from_triples([
    ///     (0.0, -1.0, 0.5),
    ///     (3.0, 0.5, 0.5),
    /// ])
    /// .is_err());
    /// ```
    pub fn from_triples(
        triples: [(f64, f64, f64); 2],
    ) -> Result<Self, ComponentParametersError> {
        let [(mu_0, sigma_0, w_0), (mu_1, sigma_1, w_1)] = triples;
        Self::new(
            [w_0, w_1],
            [
                Gaussian::new_unchecked(mu_0, sigma_0),
                Gaussian::new_unchecked(mu_1, sigma_1),
            ],
        )
    }

    /// Check every invariant of the parameters
    pub fn validate(&self) -> Result<(), ComponentParametersError> {
        for (component, cpnt) in self.components.iter().enumerate() {
            cpnt.validate().map_err(|err| {
                ComponentParametersError::Component { component, err }
            })?;
        }

        for (component, &weight) in self.weights.iter().enumerate() {
            if !(weight > 0.0 && weight < 1.0) {
                return Err(ComponentParametersError::WeightOutOfRange {
                    component,
                    weight,
                });
            }
        }

        let sum = self.weights[0] + self.weights[1];
        if (sum - 1.0).abs() > WEIGHT_SUM_TOL {
            Err(ComponentParametersError::WeightsDoNotSumToOne { sum })
        } else {
            Ok(())
        }
    }

    /// Mixing weights
    #[inline]
    pub fn weights(&self) -> &[f64; 2] {
        &self.weights
    }

    /// Component distributions
    #[inline]
    pub fn components(&self) -> &[Gaussian; 2] {
        &self.components
    }

    /// Mixing weight, α<sub>k</sub>, of component `k`
    ///
    /// # Panics
    /// If `k > 1`
    #[inline]
    pub fn weight(&self, k: usize) -> f64 {
        self.weights[k]
    }

    /// Mean, μ<sub>k</sub>, of component `k`
    ///
    /// # Panics
    /// If `k > 1`
    #[inline]
    pub fn mu(&self, k: usize) -> f64 {
        self.components[k].mu()
    }

    /// Standard deviation, σ<sub>k</sub>, of component `k`
    ///
    /// # Panics
    /// If `k > 1`
    #[inline]
    pub fn sigma(&self, k: usize) -> f64 {
        self.components[k].sigma()
    }

    /// The same mixture with the component labels exchanged
    #[must_use]
    pub fn swapped(&self) -> Self {
        let [w_0, w_1] = self.weights;
        let [c_0, c_1] = self.components.clone();
        ComponentParameters {
            weights: [w_1, w_0],
            components: [c_1, c_0],
        }
    }

    /// The same mixture with components ordered by ascending mean
    #[must_use]
    pub fn sorted_by_mean(&self) -> Self {
        if self.mu(0) <= self.mu(1) {
            self.clone()
        } else {
            self.swapped()
        }
    }

    /// ln(α<sub>k</sub>) + ln N(x; μ<sub>k</sub>, σ<sub>k</sub>) for both
    /// components
    #[inline]
    pub fn ln_weighted_densities(&self, x: f64) -> [f64; 2] {
        [
            self.weights[0].ln() + self.components[0].ln_f(&x),
            self.weights[1].ln() + self.components[1].ln_f(&x),
        ]
    }
}

impl HasDensity<f64> for ComponentParameters {
    fn ln_f(&self, x: &f64) -> f64 {
        let [a, b] = self.ln_weighted_densities(*x);
        logaddexp(a, b)
    }
}

impl Sampleable<f64> for ComponentParameters {
    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let k = if rng.gen::<f64>() < self.weights[0] { 0 } else { 1 };
        self.components[k].draw(rng)
    }
}

impl From<&ComponentParameters> for String {
    fn from(mm: &ComponentParameters) -> String {
        format!(
            "{}·{} + {}·{}",
            mm.weights[0], mm.components[0], mm.weights[1], mm.components[1]
        )
    }
}

impl_display!(ComponentParameters);

impl std::error::Error for ComponentParametersError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Component { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentParametersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component { component, err } => {
                write!(f, "component {component}: {err}")
            }
            Self::WeightOutOfRange { component, weight } => write!(
                f,
                "weight of component {component} ({weight}) must be in (0, 1)"
            ),
            Self::WeightsDoNotSumToOne { sum } => {
                write!(f, "weights sum to {sum} rather than 1")
            }
        }
    }
}
