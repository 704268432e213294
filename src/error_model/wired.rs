//! Gaussian error for cabled setups.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::core::{ErrorModelError, STD_DEV_20_MHZ_PS, STD_DEV_40_MHZ_PS};

use super::{ErrorContext, ErrorModel};

/// Channel widths with calibrated deviations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelBandwidth {
    /// 20 MHz, deviation 2562.69 ps.
    #[default]
    Mhz20,
    /// 40 MHz, deviation 1074.91 ps.
    Mhz40,
    /// 80 MHz, no calibration data.
    Mhz80,
    /// 160 MHz, no calibration data.
    Mhz160,
}

/// Wired model configuration.
///
/// | Option | Effect |
/// |---|---|
/// | `mean` | mean of the Gaussian, ps |
/// | `standard_deviation` | deviation of the Gaussian, ps |
/// | `bandwidth` | if set, replaces mean and deviation with the calibrated values |
/// | `seed` | RNG seed; a random seed is drawn when unset |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WiredConfig {
    /// Mean in picoseconds.
    pub mean: f64,
    /// Standard deviation in picoseconds.
    pub standard_deviation: f64,
    /// Calibrated channel bandwidth, applied after mean and deviation.
    pub bandwidth: Option<ChannelBandwidth>,
    /// RNG seed.
    pub seed: Option<u64>,
}

impl Default for WiredConfig {
    fn default() -> Self {
        Self {
            mean: 0.0,
            standard_deviation: STD_DEV_20_MHZ_PS,
            bandwidth: None,
            seed: None,
        }
    }
}

/// Gaussian RTT error.
///
/// Samples are truncated toward zero. Two models built with the same seed
/// and settings produce the same sequence.
#[derive(Debug, Clone)]
pub struct WiredErrorModel {
    mean: f64,
    standard_deviation: f64,
    seed: u64,
    rng: StdRng,
    dist: Normal<f64>,
}

impl WiredErrorModel {
    /// Build a model from `config`.
    pub fn new(config: WiredConfig) -> Result<Self, ErrorModelError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut model = Self {
            mean: config.mean,
            standard_deviation: config.standard_deviation,
            seed,
            rng: StdRng::seed_from_u64(seed),
            dist: normal(config.mean, config.standard_deviation)?,
        };
        if let Some(bandwidth) = config.bandwidth {
            model.set_channel_bandwidth(bandwidth);
        }
        Ok(model)
    }

    /// Default 20 MHz model with a fixed seed.
    pub fn with_seed(seed: u64) -> Result<Self, ErrorModelError> {
        Self::new(WiredConfig {
            seed: Some(seed),
            ..WiredConfig::default()
        })
    }

    /// Switch to the calibrated deviation of `bandwidth` and reset the mean to 0.
    ///
    /// 80 and 160 MHz have no calibration and leave the model unchanged.
    pub fn set_channel_bandwidth(&mut self, bandwidth: ChannelBandwidth) {
        let sd = match bandwidth {
            ChannelBandwidth::Mhz20 => STD_DEV_20_MHZ_PS,
            ChannelBandwidth::Mhz40 => STD_DEV_40_MHZ_PS,
            ChannelBandwidth::Mhz80 | ChannelBandwidth::Mhz160 => {
                debug!(?bandwidth, "no calibration for bandwidth, keeping distribution");
                return;
            }
        };
        // Calibrated constants are always valid.
        if let Ok(dist) = normal(0.0, sd) {
            self.mean = 0.0;
            self.standard_deviation = sd;
            self.dist = dist;
        }
    }

    /// Change the mean.
    pub fn set_mean(&mut self, mean: f64) -> Result<(), ErrorModelError> {
        self.dist = normal(mean, self.standard_deviation)?;
        self.mean = mean;
        Ok(())
    }

    /// Change the standard deviation.
    pub fn set_standard_deviation(&mut self, sd: f64) -> Result<(), ErrorModelError> {
        self.dist = normal(self.mean, sd)?;
        self.standard_deviation = sd;
        Ok(())
    }

    /// Reseed the generator.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Seed the generator was last seeded with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Current standard deviation.
    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }

    /// Draw one Gaussian error.
    pub fn draw(&mut self) -> i64 {
        self.dist.sample(&mut self.rng) as i64
    }

    /// Generator shared with the models layered on top.
    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl ErrorModel for WiredErrorModel {
    fn sample(&mut self, _ctx: &ErrorContext) -> i64 {
        self.draw()
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, ErrorModelError> {
    let invalid = ErrorModelError::InvalidDistribution { mean, std_dev };
    if !mean.is_finite() || !(std_dev >= 0.0) {
        return Err(invalid);
    }
    Normal::new(mean, std_dev).map_err(|_| invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = WiredErrorModel::with_seed(42).unwrap();
        let mut b = WiredErrorModel::with_seed(42).unwrap();
        let xs: Vec<i64> = (0..64).map(|_| a.draw()).collect();
        let ys: Vec<i64> = (0..64).map(|_| b.draw()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_reseed_restarts_sequence() {
        let mut model = WiredErrorModel::with_seed(7).unwrap();
        let first: Vec<i64> = (0..8).map(|_| model.draw()).collect();
        model.set_seed(7);
        let again: Vec<i64> = (0..8).map(|_| model.draw()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_bandwidth_selects_deviation() {
        let mut model = WiredErrorModel::new(WiredConfig {
            mean: 500.0,
            standard_deviation: 10.0,
            bandwidth: Some(ChannelBandwidth::Mhz40),
            seed: Some(1),
        })
        .unwrap();
        assert_eq!(model.mean(), 0.0);
        assert_eq!(model.standard_deviation(), STD_DEV_40_MHZ_PS);

        model.set_channel_bandwidth(ChannelBandwidth::Mhz80);
        assert_eq!(model.standard_deviation(), STD_DEV_40_MHZ_PS);

        model.set_channel_bandwidth(ChannelBandwidth::Mhz20);
        assert_eq!(model.standard_deviation(), STD_DEV_20_MHZ_PS);
    }

    #[test]
    fn test_sample_spread_matches_deviation() {
        let mut model = WiredErrorModel::with_seed(3).unwrap();
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| model.draw() as f64).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 100.0, "mean {mean}");
        assert!((var.sqrt() - STD_DEV_20_MHZ_PS).abs() < 150.0, "sd {}", var.sqrt());
    }

    #[test]
    fn test_invalid_deviation_rejected() {
        let mut model = WiredErrorModel::with_seed(0).unwrap();
        assert!(model.set_standard_deviation(f64::NAN).is_err());
        assert!(model.set_standard_deviation(-1.0).is_err());
        assert_eq!(model.standard_deviation(), STD_DEV_20_MHZ_PS);
    }
}
