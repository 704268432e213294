//! Round-trip time arithmetic on 48-bit timestamps.

use crate::core::{SPEED_OF_LIGHT, TIMESTAMP_MASK};

use super::dialog::FtmDialog;

/// Elapsed ticks from `start` to `end`, allowing one 48-bit wrap.
///
/// On a wrap the result is `(2^48 - 1 - start) + end`.
pub fn timestamp_diff(start: u64, end: u64) -> u64 {
    if end < start {
        TIMESTAMP_MASK.saturating_sub(start) + end
    } else {
        end - start
    }
}

/// Raw RTT of a complete dialog in picoseconds, before any error model.
///
/// `(t4 - t1) - (t3 - t2) - 2 * preamble`. Both frames of the dialog carry
/// the preamble detection latency in their receive timestamps.
pub fn dialog_rtt(dialog: &FtmDialog, preamble_detection_ps: i64) -> i64 {
    let d41 = timestamp_diff(dialog.t1, dialog.t4) as i64;
    let d32 = timestamp_diff(dialog.t2, dialog.t3) as i64;
    d41 - d32 - 2 * preamble_detection_ps
}

/// Integer mean of RTT samples rounded toward zero, 0 when empty.
pub fn mean_rtt(rtts: &[i64]) -> i64 {
    if rtts.is_empty() {
        return 0;
    }
    rtts.iter().sum::<i64>() / rtts.len() as i64
}

/// One-way distance in metres for a round-trip time in picoseconds.
pub fn rtt_to_distance(rtt_ps: i64) -> f64 {
    rtt_ps as f64 * 1e-12 * SPEED_OF_LIGHT / 2.0
}
