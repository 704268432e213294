//! Protocol constants for Fine Timing Measurement.
//!
//! Element identifiers and sizes follow IEEE 802.11-2016 9.4.2.168 and the
//! public action frame encoding. Timing defaults are the values the session
//! state machine falls back to when a peer expresses no preference.

use std::time::Duration;

// =============================================================================
// ELEMENTS
// =============================================================================

/// Element ID of the Fine Timing Measurement Parameters element.
pub const FTM_PARAMS_ELEMENT_ID: u8 = 206;

/// Length field of the Fine Timing Measurement Parameters element.
pub const FTM_PARAMS_TAG_LENGTH: u8 = 9;

/// Encoded size of the parameters element (id + length + body).
pub const FTM_PARAMS_SIZE: usize = 11;

/// Element ID of the TSF sync info element (extension element).
pub const TSF_SYNC_ELEMENT_ID: u8 = 255;

/// Length field of the TSF sync info element.
pub const TSF_SYNC_LENGTH: u8 = 5;

/// Element ID extension of the TSF sync info element.
pub const TSF_SYNC_ELEMENT_ID_EXTENSION: u8 = 9;

/// Encoded size of the TSF sync info element.
pub const TSF_SYNC_SIZE: usize = 7;

// =============================================================================
// HEADERS
// =============================================================================

/// Encoded size of the FTM request header without parameters (trigger byte).
pub const FTM_REQUEST_HEADER_SIZE: usize = 1;

/// Encoded size of the FTM response header without parameters.
pub const FTM_RESPONSE_HEADER_SIZE: usize = 18;

/// Size of a packed 48-bit timestamp.
pub const TIMESTAMP_SIZE: usize = 6;

/// Mask applied to picosecond clocks to obtain 48-bit protocol timestamps.
pub const TIMESTAMP_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// Public action category code.
pub const CATEGORY_PUBLIC_ACTION: u8 = 4;

/// Public action code of an FTM request.
pub const ACTION_FTM_REQUEST: u8 = 32;

/// Public action code of an FTM response (the FTM frame itself).
pub const ACTION_FTM_RESPONSE: u8 = 33;

// =============================================================================
// DIALOGS
// =============================================================================

/// Dialog token that means "no dialog". On an FTM response it ends the session.
pub const NO_DIALOG: u8 = 0;

/// First dialog token a responder hands out.
pub const FIRST_DIALOG_TOKEN: u8 = 1;

// =============================================================================
// TIMING
// =============================================================================

/// Burst start delay used when the initiator has no partial TSF preference.
pub const NO_PREFERENCE_BURST_DELAY_MS: u16 = 500;

/// Divisor applied to the inter-frame delay when waiting for timestamps.
pub const TIMESTAMP_RETRY_DIVISOR: u32 = 10;

/// Consecutive timestamp retries before the responder stops waiting.
pub const MAX_TIMESTAMP_RETRIES: u32 = 100;

/// Preamble detection duration of the modeled PHY.
pub const DEFAULT_PREAMBLE_DETECTION: Duration = Duration::from_micros(4);

/// Unit of the min delta FTM field.
pub const MIN_DELTA_FTM_UNIT_US: u64 = 100;

/// Unit of the burst period field.
pub const BURST_PERIOD_UNIT_MS: u64 = 100;

/// Speed of light in vacuum, metres per second.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

// =============================================================================
// ERROR MODELS
// =============================================================================

/// Measured RTT standard deviation on a 20 MHz channel, in picoseconds.
pub const STD_DEV_20_MHZ_PS: f64 = 2562.69;

/// Measured RTT standard deviation on a 40 MHz channel, in picoseconds.
pub const STD_DEV_40_MHZ_PS: f64 = 1074.91;

// =============================================================================
// MANAGER
// =============================================================================

/// Replacement sessions a single inbound request may spawn through an override.
pub const MAX_OVERRIDE_CHAIN: usize = 1;
