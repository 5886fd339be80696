//! The EM iteration loop
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use itertools::Itertools;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::data::Sample;
use crate::dist::ComponentParameters;
use crate::em::{
    expectation, initialize, maximization, ConfigError, EmConfig, EmError,
    FitFailure, Initialization, Responsibilities,
};

/// Snapshot of a fit after a completed E-step.
///
/// Every iteration produces a new snapshot; the previous one is left intact.
#[derive(Debug, Clone, PartialEq)]
pub struct FitState {
    params: ComponentParameters,
    responsibilities: Responsibilities,
    ln_likelihood: f64,
    history: Vec<f64>,
    n_iters: usize,
    n_clamped: usize,
}

impl FitState {
    /// Parameters the current responsibilities were computed from
    #[inline]
    pub fn params(&self) -> &ComponentParameters {
        &self.params
    }

    #[inline]
    pub fn responsibilities(&self) -> &Responsibilities {
        &self.responsibilities
    }

    /// Log-likelihood of the sample under `params`
    #[inline]
    pub fn ln_likelihood(&self) -> f64 {
        self.ln_likelihood
    }

    /// Log-likelihood after every completed E-step, oldest first
    #[inline]
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Number of completed M-step/E-step iterations
    #[inline]
    pub fn n_iters(&self) -> usize {
        self.n_iters
    }

    /// Total number of clamped densities over all E-steps
    #[inline]
    pub fn n_clamped(&self) -> usize {
        self.n_clamped
    }

    /// `true` if no log-likelihood in the history is more than `delta` below
    /// its predecessor
    pub fn is_monotone(&self, delta: f64) -> bool {
        self.history
            .iter()
            .tuple_windows()
            .all(|(prev, next)| *next >= prev - delta)
    }
}

/// What the driver does after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue,
    Converged,
    Exhausted,
}

/// Decide how to proceed from two consecutive snapshots.
///
/// Converged if |ℓ<sub>prev</sub> − ℓ<sub>next</sub>| < `tol`, otherwise
/// exhausted once `next` has used up `max_iters`.
pub fn transition(prev: &FitState, next: &FitState, config: &EmConfig) -> Transition {
    let delta = (prev.ln_likelihood - next.ln_likelihood).abs();
    if delta < config.tol {
        Transition::Converged
    } else if next.n_iters >= config.max_iters {
        Transition::Exhausted
    } else {
        Transition::Continue
    }
}

/// How a fit that did not fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum FitStatus {
    /// The log-likelihood change dropped below the threshold
    Converged,
    /// The iteration cap was reached first. The parameters are the best
    /// available estimate but convergence is not certified.
    Exhausted,
    /// The cancellation flag was raised between iterations
    Cancelled,
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a fit that did not fail
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct FitReport {
    status: FitStatus,
    state: FitState,
}

impl FitReport {
    #[inline]
    pub fn status(&self) -> FitStatus {
        self.status
    }

    /// `true` only if the fit converged
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    #[inline]
    pub fn state(&self) -> &FitState {
        &self.state
    }

    /// Fitted parameters
    #[inline]
    pub fn params(&self) -> &ComponentParameters {
        self.state.params()
    }

    #[inline]
    pub fn history(&self) -> &[f64] {
        self.state.history()
    }

    #[inline]
    pub fn ln_likelihood(&self) -> f64 {
        self.state.ln_likelihood()
    }

    #[inline]
    pub fn n_iters(&self) -> usize {
        self.state.n_iters()
    }

    #[inline]
    pub fn n_clamped(&self) -> usize {
        self.state.n_clamped()
    }

    pub fn into_state(self) -> FitState {
        self.state
    }
}

enum Phase {
    Iterating(FitState),
    Done(FitStatus, FitState),
    Failed(FitFailure),
}

/// Expectation-maximization for a two-component Gaussian mixture.
///
/// # Example
///
/// ```
/// use emix::em::{Em, EmConfig, FitStatus};
///
/// let xs: Vec<f64> = (0..40)
///     .map(|i| if i % 2 == 0 { 0.1 * (i % 5) as f64 } else { 8.0 + 0.1 * (i % 3) as f64 })
///     .collect();
///
/// let em = Em::new(EmConfig::default()).unwrap();
/// let report = em.fit(&xs).unwrap();
///
/// assert_eq!(report.status(), FitStatus::Converged);
/// let params = report.params().sorted_by_mean();
/// assert!(params.mu(0) < 1.0);
/// assert!(params.mu(1) > 7.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Em {
    config: EmConfig,
}

impl Em {
    pub fn new(config: EmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Em { config })
    }

    #[inline]
    pub fn config(&self) -> &EmConfig {
        &self.config
    }

    /// Initialize and run the first E-step
    pub fn initialize(&self, sample: &Sample) -> Result<FitState, EmError> {
        let params = initialize(sample, &self.config.init)?;
        let exp = expectation(sample, &params, self.config.underflow)?;
        Ok(FitState {
            params,
            responsibilities: exp.responsibilities,
            ln_likelihood: exp.ln_likelihood,
            history: vec![exp.ln_likelihood],
            n_iters: 0,
            n_clamped: exp.n_clamped,
        })
    }

    /// One M-step followed by one E-step, producing the next snapshot
    pub fn step(
        &self,
        sample: &Sample,
        state: &FitState,
    ) -> Result<FitState, EmError> {
        let params = maximization(sample, &state.responsibilities)?;
        let exp = expectation(sample, &params, self.config.underflow)?;

        let mut history = Vec::with_capacity(state.history.len() + 1);
        history.extend_from_slice(&state.history);
        history.push(exp.ln_likelihood);

        Ok(FitState {
            params,
            responsibilities: exp.responsibilities,
            ln_likelihood: exp.ln_likelihood,
            history,
            n_iters: state.n_iters + 1,
            n_clamped: state.n_clamped + exp.n_clamped,
        })
    }

    /// Validate `xs` and fit
    pub fn fit(&self, xs: &[f64]) -> Result<FitReport, FitFailure> {
        let sample = Sample::new(xs).map_err(EmError::from)?;
        self.fit_sample(&sample)
    }

    pub fn fit_sample(&self, sample: &Sample) -> Result<FitReport, FitFailure> {
        self.run(sample, None)
    }

    /// Fit, checking `cancel` before every iteration. A raised flag ends the
    /// fit with [`FitStatus::Cancelled`] and the last completed snapshot.
    pub fn fit_cancellable(
        &self,
        sample: &Sample,
        cancel: &AtomicBool,
    ) -> Result<FitReport, FitFailure> {
        self.run(sample, Some(cancel))
    }

    /// Run one k-means-initialized fit per seed and keep the one with the
    /// highest final log-likelihood. Ties go to the earlier seed.
    ///
    /// If every fit fails, the failure of the first seed is returned. With no
    /// seeds, this is `fit_sample` with the configured initialization.
    pub fn fit_restarts(
        &self,
        sample: &Sample,
        seeds: &[u64],
    ) -> Result<FitReport, FitFailure> {
        let fit_seed = |&seed: &u64| {
            let config = self
                .config
                .clone()
                .with_init(Initialization::KMeans { seed });
            let res = Em { config }.fit_sample(sample);
            if let Err(failure) = &res {
                log::debug!("restart with seed {seed} failed: {failure}");
            }
            res
        };

        #[cfg(feature = "parallel")]
        let results: Vec<_> = seeds.par_iter().map(fit_seed).collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = seeds.iter().map(fit_seed).collect();

        results
            .into_iter()
            .reduce(|acc, res| match (acc, res) {
                (Ok(best), Ok(report)) => {
                    if report.ln_likelihood() > best.ln_likelihood() {
                        Ok(report)
                    } else {
                        Ok(best)
                    }
                }
                (Err(_), Ok(report)) => Ok(report),
                (acc, Err(_)) => acc,
            })
            .unwrap_or_else(|| self.fit_sample(sample))
    }

    fn run(
        &self,
        sample: &Sample,
        cancel: Option<&AtomicBool>,
    ) -> Result<FitReport, FitFailure> {
        let init = self.initialize(sample)?;
        log::debug!("EM initialized with ln_likelihood = {}", init.ln_likelihood);

        let mut phase = if self.config.max_iters == 0 {
            Phase::Done(FitStatus::Exhausted, init)
        } else {
            Phase::Iterating(init)
        };

        loop {
            phase = match phase {
                Phase::Iterating(state) => self.advance(sample, state, cancel),
                Phase::Done(status, state) => {
                    match status {
                        FitStatus::Converged => log::info!(
                            "EM converged after {} iterations \
                             (ln_likelihood = {})",
                            state.n_iters,
                            state.ln_likelihood
                        ),
                        FitStatus::Exhausted => log::warn!(
                            "EM did not converge within {} iterations",
                            self.config.max_iters
                        ),
                        FitStatus::Cancelled => log::warn!(
                            "EM cancelled after {} iterations",
                            state.n_iters
                        ),
                    }
                    return Ok(FitReport { status, state });
                }
                Phase::Failed(failure) => {
                    log::debug!("{failure}");
                    return Err(failure);
                }
            }
        }
    }

    fn advance(
        &self,
        sample: &Sample,
        state: FitState,
        cancel: Option<&AtomicBool>,
    ) -> Phase {
        if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
            return Phase::Done(FitStatus::Cancelled, state);
        }

        match self.step(sample, &state) {
            Ok(next) => {
                log::debug!(
                    "EM iteration {}: ln_likelihood = {}, delta = {}",
                    next.n_iters,
                    next.ln_likelihood,
                    next.ln_likelihood - state.ln_likelihood
                );
                match transition(&state, &next, &self.config) {
                    Transition::Continue => Phase::Iterating(next),
                    Transition::Converged => {
                        Phase::Done(FitStatus::Converged, next)
                    }
                    Transition::Exhausted => {
                        Phase::Done(FitStatus::Exhausted, next)
                    }
                }
            }
            Err(err) => Phase::Failed(FitFailure::new(err, Some(state))),
        }
    }
}
