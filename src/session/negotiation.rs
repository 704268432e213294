//! Responder-side validation of requested FTM parameters.

use tracing::warn;

use crate::core::ParamsRejection;
use crate::wire::{FtmParams, StatusIndication};

/// Bursts exponent that asks the responder to choose.
const NO_PREFERENCE_EXPONENT: u8 = 15;

/// Burst duration code that asks the responder to choose.
const NO_PREFERENCE_DURATION: u8 = 15;

/// Validate a requested parameter set, filling unspecified fields from `defaults`.
///
/// On success the returned copy is what the responder answers with: status
/// `Successful` and ASAP capable set. The checks run in a fixed order and the
/// first failing one decides the rejection.
pub fn validate_params(
    requested: &FtmParams,
    defaults: &FtmParams,
) -> Result<FtmParams, ParamsRejection> {
    let result = check(requested, defaults);
    if let Err(reason) = &result {
        warn!(%reason, "FTM session denied");
    }
    result
}

fn check(requested: &FtmParams, defaults: &FtmParams) -> Result<FtmParams, ParamsRejection> {
    let mut p = *requested;

    if p.status_indication != StatusIndication::Reserved {
        return Err(ParamsRejection::StatusNotReserved(p.status_indication.as_bits()));
    }
    if p.bursts_exponent == NO_PREFERENCE_EXPONENT {
        p.bursts_exponent = defaults.bursts_exponent;
    }

    let duration = p.burst_duration;
    if duration <= 1 || (12..=14).contains(&duration) {
        return Err(ParamsRejection::ReservedBurstDuration(duration));
    }
    if duration == NO_PREFERENCE_DURATION {
        p.burst_duration = defaults.burst_duration;
    }

    if p.min_delta_ftm == 0 {
        p.min_delta_ftm = defaults.min_delta_ftm;
    }
    if p.asap_capable {
        return Err(ParamsRejection::AsapCapableInRequest);
    }
    if p.ftms_per_burst == 0 {
        p.ftms_per_burst = defaults.ftms_per_burst;
    }

    // A single burst has no period.
    if p.bursts_exponent == 0 && p.burst_period != 0 {
        return Err(ParamsRejection::PeriodWithSingleBurst {
            period: p.burst_period,
        });
    }
    if p.burst_period == 0 && p.bursts_exponent > 0 {
        p.burst_period = defaults.burst_period;
    }

    // Room for every FTM plus one slot at min delta spacing.
    let required_us = (u32::from(p.ftms_per_burst) + 1) * u32::from(p.min_delta_ftm) * 100;
    let available_us = p.burst_duration_us();
    if required_us > available_us {
        return Err(ParamsRejection::BurstTooShort {
            required_us,
            available_us,
        });
    }

    if p.ftms_per_burst == 1 && p.bursts_exponent == 0 {
        return Err(ParamsRejection::SingleFrameSession);
    }

    p.status_indication = StatusIndication::Successful;
    p.asap_capable = true;
    Ok(p)
}
