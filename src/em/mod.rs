//! Expectation-maximization for a two-component univariate Gaussian mixture.
//!
//! A fit is a sequence of immutable [`FitState`] snapshots. The first comes
//! from [`initialize`] followed by one [`expectation`] step; every later one
//! from a [`maximization`] step followed by an [`expectation`] step. The
//! [`Em`] driver decides after each snapshot whether to stop via
//! [`transition`].
//!
//! # Example
//!
//! ```
//! use emix::data::Sample;
//! use emix::em::{Em, EmConfig, Initialization};
//!
//! let xs: Vec<f64> = (0..100)
//!     .map(|i| if i < 50 { i as f64 / 50.0 } else { 10.0 + i as f64 / 50.0 })
//!     .collect();
//! let sample = Sample::new(&xs).unwrap();
//!
//! let em = Em::new(EmConfig::default().with_init(Initialization::SortedHalves)).unwrap();
//! let report = em.fit_sample(&sample).unwrap();
//!
//! assert!(report.is_converged());
//! assert!((report.params().weight(0) - 0.5).abs() < 1E-6);
//! ```
mod config;
mod driver;
mod error;
mod estep;
mod init;
mod mstep;

pub use config::{EmConfig, Initialization, UnderflowPolicy};
pub use driver::{transition, Em, FitReport, FitState, FitStatus, Transition};
pub use error::{ConfigError, Degeneracy, EmError, FitFailure};
pub use estep::{expectation, Expectation, Responsibilities};
pub use init::{initialize, kmeans_labels, sorted_halves_labels};
pub use mstep::maximization;
