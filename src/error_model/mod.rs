//! Measurement error models.
//!
//! An [`ErrorModel`] turns an ideal round-trip time into a realistic one by
//! returning an additive error, in picoseconds, each time an RTT sample is
//! computed. The models stack:
//!
//! | Model | Error |
//! |---|---|
//! | [`NullErrorModel`] | always 0 |
//! | [`WiredErrorModel`] | Gaussian noise, deviation by channel bandwidth |
//! | [`WirelessErrorModel`] | wired noise plus spatial bias from a [`BiasMap`] |
//! | [`SignalStrengthErrorModel`] | wireless error plus Johnson SU noise by signal strength |

mod bias_map;
mod signal_strength;
mod wired;
mod wireless;

pub use bias_map::BiasMap;
pub use signal_strength::{
    JOHNSON_SU_TABLE, JohnsonSu, SignalStrengthErrorModel, closest_signal_strength,
    normal_cdf_inverse,
};
pub use wired::{ChannelBandwidth, WiredConfig, WiredErrorModel};
pub use wireless::WirelessErrorModel;

/// Inputs available to an error model when a sample is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorContext {
    /// Receive power of the most recent FTM frame, in dBm.
    pub signal_strength: Option<f64>,
}

impl ErrorContext {
    /// Context carrying a signal strength sample.
    pub fn with_signal_strength(dbm: f64) -> Self {
        Self {
            signal_strength: Some(dbm),
        }
    }
}

/// Strategy producing an additive RTT error in picoseconds.
pub trait ErrorModel: Send {
    /// Draw the error for one RTT sample.
    fn sample(&mut self, ctx: &ErrorContext) -> i64;
}

/// Error model that never adds error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullErrorModel;

impl ErrorModel for NullErrorModel {
    fn sample(&mut self, _ctx: &ErrorContext) -> i64 {
        0
    }
}

impl<M: ErrorModel + ?Sized> ErrorModel for Box<M> {
    fn sample(&mut self, ctx: &ErrorContext) -> i64 {
        (**self).sample(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_model_is_zero() {
        let mut model = NullErrorModel;
        let ctx = ErrorContext::with_signal_strength(-60.0);
        assert!((0..16).all(|_| model.sample(&ctx) == 0));
    }

    #[test]
    fn test_boxed_model_delegates() {
        let mut model: Box<dyn ErrorModel> = Box::new(NullErrorModel);
        assert_eq!(model.sample(&ErrorContext::default()), 0);
    }
}
