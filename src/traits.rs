//! Trait definitions
use rand::Rng;

/// Has a (log) density function
pub trait HasDensity<X> {
    /// Probability density function at `x`
    ///
    /// # Example
    ///
    /// ```rust
    /// use emix::dist::Gaussian;
    /// use emix::traits::HasDensity;
    ///
    /// let g = Gaussian::standard();
    /// assert!(g.f(&0.0_f64) > g.f(&1.0_f64));
    /// ```
    fn f(&self, x: &X) -> f64 {
        self.ln_f(x).exp()
    }

    /// Log of the probability density function at `x`
    fn ln_f(&self, x: &X) -> f64;
}

/// Can draw random values
pub trait Sampleable<X> {
    /// Single draw
    fn draw<R: Rng>(&self, rng: &mut R) -> X;

    /// Multiple draws
    ///
    /// # Example
    ///
    /// ```rust
    /// use emix::dist::Gaussian;
    /// use emix::traits::Sampleable;
    ///
    /// let g = Gaussian::standard();
    /// let xs: Vec<f64> = g.sample(10, &mut rand::thread_rng());
    /// assert_eq!(xs.len(), 10);
    /// ```
    fn sample<R: Rng>(&self, n: usize, mut rng: &mut R) -> Vec<X> {
        (0..n).map(|_| self.draw(&mut rng)).collect()
    }
}

/// Has a cumulative distribution function
pub trait Cdf<X> {
    /// The value of the Cumulative Density Function at `x`
    fn cdf(&self, x: &X) -> f64;
}

/// Has an inverse cumulative distribution function
pub trait InverseCdf<X> {
    /// The value of `x` at the given probability in the CDF
    fn invcdf(&self, p: f64) -> X;
}

pub trait Mean<X> {
    fn mean(&self) -> Option<X>;
}

pub trait Variance<X> {
    fn variance(&self) -> Option<X>;
}
