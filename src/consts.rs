//! Mathematical and numerical constants

/// 0.5 ln(2π)
pub const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;

/// ln(f64::MIN_POSITIVE), the log of the smallest normal `f64`.
///
/// A mixture density whose log falls below this value is considered to have
/// underflowed.
pub const LN_MIN_DENSITY: f64 = -708.396_418_532_264_1;

/// Effective counts at or below `n * COLLAPSE_FLOOR` are treated as zero.
pub const COLLAPSE_FLOOR: f64 = f64::EPSILON;

/// Tolerance on `1 - (α_0 + α_1)` accepted by the checked constructors.
pub const WEIGHT_SUM_TOL: f64 = 1E-9;

/// Default log-likelihood convergence threshold
pub const DEFAULT_TOL: f64 = 1E-5;

/// Default cap on the number of EM iterations
pub const DEFAULT_MAX_ITERS: usize = 100;

/// Maximum number of Lloyd rounds the k-means initializer runs
pub const KMEANS_MAX_ITERS: usize = 100;

/// Number of observations processed together in the E- and M-step
/// reductions
pub const CHUNK_SIZE: usize = 1024;
