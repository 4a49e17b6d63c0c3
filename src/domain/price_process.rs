//! Geometric Brownian Motion price step.
//!
//! One call advances a price by one trading day (`dt = 1.0`):
//!
//! ```text
//! drift     = (mu - sigma^2 / 2) * dt
//! diffusion = sigma * sqrt(dt) * eps,   eps ~ N(0, 1)
//! price'    = price * exp(drift + diffusion)
//! ```
//!
//! The result stays strictly positive for any positive, finite input.

use rand::Rng;
use rand_distr::StandardNormal;

use super::error::StocksimError;

pub const DEFAULT_MU: f64 = 0.0005;
pub const DEFAULT_SIGMA: f64 = 0.02;

const DT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gbm {
    mu: f64,
    sigma: f64,
}

impl Gbm {
    /// Build a process, rejecting non-finite parameters and negative volatility.
    pub fn new(mu: f64, sigma: f64) -> Result<Self, StocksimError> {
        if !mu.is_finite() {
            return Err(StocksimError::InvalidParameter {
                name: "mu".into(),
                reason: format!("drift must be finite, got {mu}"),
            });
        }
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(StocksimError::InvalidParameter {
                name: "sigma".into(),
                reason: format!("volatility must be finite and >= 0, got {sigma}"),
            });
        }
        Ok(Gbm { mu, sigma })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Apply one step with an explicit standard-normal shock.
    pub fn step(&self, price: f64, eps: f64) -> f64 {
        let drift = (self.mu - 0.5 * self.sigma * self.sigma) * DT;
        let diffusion = self.sigma * DT.sqrt() * eps;
        price * (drift + diffusion).exp()
    }

    /// Draw a shock from `rng` and apply one step.
    pub fn simulate_day<R: Rng + ?Sized>(&self, price: f64, rng: &mut R) -> f64 {
        let eps: f64 = rng.sample(StandardNormal);
        self.step(price, eps)
    }
}

impl Default for Gbm {
    fn default() -> Self {
        Gbm {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_shock_applies_only_drift() {
        let gbm = Gbm::new(0.001, 0.02).unwrap();
        let expected = 100.0 * (0.001 - 0.5 * 0.02 * 0.02_f64).exp();
        assert_relative_eq!(gbm.step(100.0, 0.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn zero_volatility_is_deterministic_growth() {
        let gbm = Gbm::new(0.01, 0.0).unwrap();
        assert_relative_eq!(gbm.step(50.0, 3.0), 50.0 * 0.01_f64.exp(), epsilon = 1e-12);
    }

    #[test]
    fn positive_shock_raises_price() {
        let gbm = Gbm::new(0.0, 0.05).unwrap();
        assert!(gbm.step(10.0, 2.0) > 10.0);
        assert!(gbm.step(10.0, -2.0) < 10.0);
    }

    #[test]
    fn extreme_shock_stays_positive() {
        let gbm = Gbm::new(0.0, 0.5).unwrap();
        let price = gbm.step(1.0, -20.0);
        assert!(price > 0.0);
        assert!(price.is_finite());
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let gbm = Gbm::default();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let pa: Vec<f64> = (0..5).map(|_| gbm.simulate_day(100.0, &mut a)).collect();
        let pb: Vec<f64> = (0..5).map(|_| gbm.simulate_day(100.0, &mut b)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn rejects_non_finite_parameters() {
        assert!(Gbm::new(f64::NAN, 0.02).is_err());
        assert!(Gbm::new(0.0, f64::INFINITY).is_err());
        assert!(Gbm::new(0.0, -0.1).is_err());
    }

    #[test]
    fn default_parameters() {
        let gbm = Gbm::default();
        assert!((gbm.mu() - DEFAULT_MU).abs() < f64::EPSILON);
        assert!((gbm.sigma() - DEFAULT_SIGMA).abs() < f64::EPSILON);
    }
}
