use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::LogNormal;
use std::sync::atomic::AtomicU64;

/// Seed for the current scenario iteration, set by main before each run.
/// Scenarios read it so that `scenario all 20` exercises 20 different draws.
pub static RAND_SEED: AtomicU64 = AtomicU64::new(0);

/// Convert mean and standard deviation to log-normal distribution parameters
/// Returns (μ, σ) for LogNormal(μ, σ) that approximates the given mean and stddev
///
/// For LogNormal(μ, σ):
/// - E[X] = exp(μ + σ²/2)
/// - Var[X] = (exp(σ²) - 1) * exp(2μ + σ²)
///
/// To convert from mean (m) and stddev (s):
/// - σ = sqrt(ln(1 + s²/m²))
/// - μ = ln(m) - σ²/2
fn lognormal_from_mean_stddev(mean: f64, stddev: f64) -> (f64, f64) {
    let variance = stddev * stddev;
    let sigma_squared = (1.0 + variance / (mean * mean)).ln();
    let sigma = sigma_squared.sqrt();
    let mu = mean.ln() - sigma_squared / 2.0;
    (mu, sigma)
}

/// Create a log-normal distribution from mean and standard deviation
pub fn lognormal_dist(mean: f64, stddev: f64) -> LogNormal<f64> {
    let (mu, sigma) = lognormal_from_mean_stddev(mean, stddev);
    LogNormal::new(mu, sigma).unwrap()
}

/// Symmetric multiplicative jitter: a factor drawn uniformly from
/// [1 - fraction, 1 + fraction], floored at zero.
/// A zero fraction draws nothing and returns exactly 1.0, so runs with
/// volatility switched off stay deterministic per seed.
pub fn jitter_factor(rng: &mut StdRng, fraction: f64) -> f64 {
    if fraction == 0.0 {
        return 1.0;
    }
    (1.0 + rng.gen_range(-fraction..=fraction)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_lognormal_mean_roundtrip() {
        let (mu, sigma) = lognormal_from_mean_stddev(10.0, 3.0);
        let mean_back = (mu + sigma * sigma / 2.0).exp();
        assert!((mean_back - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_jitter_zero_fraction_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jitter_factor(&mut rng, 0.0), 1.0);
    }

    #[test]
    fn test_jitter_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let f = jitter_factor(&mut rng, 0.2);
            assert!((0.8..=1.2).contains(&f), "jitter {} out of bounds", f);
        }
    }
}
