use crate::misc::reduce::Merge;

/// Responsibility-weighted Gaussian sufficient statistic.
///
/// Holds the effective number of observations, Σw, and the weighted sum,
/// Σwx. The weighted spread about a known mean is accumulated separately by
/// [`WeightedGaussianSuffStat::sq_dev`] so the variance never comes from the
/// cancellation-prone Σwx² - (Σwx)²/Σw formula.
///
/// Statistics built over disjoint parts of the data combine with `merge`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightedGaussianSuffStat {
    /// Σw
    n_eff: f64,
    /// Σwx
    sum_x: f64,
}

impl WeightedGaussianSuffStat {
    #[inline]
    pub fn new() -> Self {
        WeightedGaussianSuffStat {
            n_eff: 0.0,
            sum_x: 0.0,
        }
    }

    /// Build the statistic from paired observations and weights
    ///
    /// # Example
    ///
    /// ```
    /// # use emix::data::WeightedGaussianSuffStat;
    /// let xs = [1.0, 2.0, 3.0];
    /// let ws = [1.0, 0.5, 0.0];
    /// let stat = WeightedGaussianSuffStat::from_weighted(&xs, &ws);
    ///
    /// assert_eq!(stat.n_eff(), 1.5);
    /// assert_eq!(stat.sum_x(), 2.0);
    /// ```
    pub fn from_weighted(xs: &[f64], ws: &[f64]) -> Self {
        xs.iter().zip(ws.iter()).fold(Self::new(), |mut stat, (&x, &w)| {
            stat.observe(x, w);
            stat
        })
    }

    /// Add observation `x` with weight `w`
    #[inline]
    pub fn observe(&mut self, x: f64, w: f64) {
        self.n_eff += w;
        self.sum_x = w.mul_add(x, self.sum_x);
    }

    /// Effective number of observations, Σw
    #[inline]
    pub fn n_eff(&self) -> f64 {
        self.n_eff
    }

    /// Weighted sum, Σwx
    #[inline]
    pub fn sum_x(&self) -> f64 {
        self.sum_x
    }

    /// Weighted mean, Σwx / Σw
    #[inline]
    pub fn mean(&self) -> f64 {
        self.sum_x / self.n_eff
    }

    /// Weighted squared deviation of `x` from `mean`, w(x - mean)²
    #[inline]
    pub fn sq_dev(x: f64, w: f64, mean: f64) -> f64 {
        let d = x - mean;
        w * d * d
    }
}

impl Merge for WeightedGaussianSuffStat {
    fn identity() -> Self {
        Self::new()
    }

    fn merge(self, other: Self) -> Self {
        WeightedGaussianSuffStat {
            n_eff: self.n_eff + other.n_eff,
            sum_x: self.sum_x + other.sum_x,
        }
    }
}
