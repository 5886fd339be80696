//! Fit two-component univariate Gaussian mixtures by expectation-maximization.
//!
//! # Example
//!
//! Fit a mixture to data drawn from a known mixture
//!
//! ```
//! use emix::dist::ComponentParameters;
//! use emix::em::{Em, EmConfig};
//! use emix::traits::Sampleable;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(1337);
//! let truth = ComponentParameters::from_triples([
//!     (-2.0, 0.5, 0.3),
//!     (3.0, 1.0, 0.7),
//! ]).unwrap();
//! let xs: Vec<f64> = truth.sample(1_000, &mut rng);
//!
//! let report = Em::new(EmConfig::default().with_seed(7))
//!     .unwrap()
//!     .fit(&xs)
//!     .unwrap();
//!
//! let fitted = report.params().sorted_by_mean();
//! assert!((fitted.mu(0) + 2.0).abs() < 0.2);
//! assert!((fitted.mu(1) - 3.0).abs() < 0.2);
//! ```
//!
//! # Features
//!
//! - `serde1`: `Serialize` and `Deserialize` for parameters, configuration
//!   and statuses
//! - `parallel`: compute the E- and M-step reductions and restarts on the
//!   rayon thread pool. Results are identical with and without it.
pub mod consts;
pub mod data;
pub mod dist;
pub mod em;
pub mod misc;
mod test;
pub mod traits;

pub mod prelude {
    pub use crate::data::Sample;
    pub use crate::dist::{ComponentParameters, Gaussian};
    pub use crate::em::{
        Em, EmConfig, EmError, FitFailure, FitReport, FitStatus,
        Initialization, UnderflowPolicy,
    };
    pub use crate::traits::*;
}

#[macro_export]
macro_rules! impl_display {
    ($kind: ty) => {
        impl ::std::fmt::Display for $kind {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", String::from(self))
            }
        }
    };
}
