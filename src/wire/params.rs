//! Fine Timing Measurement Parameters element.
//!
//! Wire format (11 bytes):
//! ```text
//! +------+-----+-----------------+---------------+-----------+-------------+
//! | 206  | 9   | status|value    | exp|duration  | min delta | partial TSF |
//! | 1 B  | 1 B | 2 bit|5 bit     | 4 bit|4 bit  | 1 B       | 2 B (BE)    |
//! +------+-----+-----------------+---------------+-----------+-------------+
//! | nopref|asapcap|asap|ftms    | format<<2 | burst period |
//! | 1|1|1|5 bit                 | 1 B       | 2 B (BE)     |
//! +------------------------------+-----------+--------------+
//! ```

use std::time::Duration;

use crate::core::{
    BURST_PERIOD_UNIT_MS, FTM_PARAMS_ELEMENT_ID, FTM_PARAMS_SIZE, FTM_PARAMS_TAG_LENGTH,
    HeaderError, MIN_DELTA_FTM_UNIT_US,
};

/// Status indication field of the parameters element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum StatusIndication {
    /// Must be used in requests.
    #[default]
    Reserved = 0,
    /// Request accepted.
    Successful = 1,
    /// Responder cannot honor the request at all.
    RequestIncapable = 2,
    /// Request failed; the status value carries a back-off in seconds.
    RequestFailed = 3,
}

impl StatusIndication {
    /// Parse from the low two bits of a byte.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            1 => Self::Successful,
            2 => Self::RequestIncapable,
            3 => Self::RequestFailed,
            _ => Self::Reserved,
        }
    }

    /// Two-bit wire representation.
    pub fn as_bits(self) -> u8 {
        self as u8
    }
}

/// Decode a burst duration code into microseconds.
///
/// Codes 2 through 11 map to `125 * 2^(code - 1)` us (250 us to 128 ms).
/// Every other code, including the no-preference value 15, decodes to 0.
pub fn decode_burst_duration(code: u8) -> u32 {
    match code {
        2..=11 => 125 * (1u32 << (code - 1)),
        _ => 0,
    }
}

/// Negotiated FTM session parameters.
///
/// All fields are stored at wire width; setters are plain field writes and
/// encoding masks every field to its bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FtmParams {
    /// Status indication.
    pub status_indication: StatusIndication,
    /// Status value, 0 to 31. Seconds to back off on `RequestFailed`.
    pub status_value: u8,
    /// Number of bursts exponent; the session runs `2^exponent` bursts. 15 means no preference.
    pub bursts_exponent: u8,
    /// Burst duration code, see [`decode_burst_duration`].
    pub burst_duration: u8,
    /// Minimum delta between FTM frames, in 100 us units.
    pub min_delta_ftm: u8,
    /// Partial TSF timer: delay before the first burst, in milliseconds.
    pub partial_tsf_timer: u16,
    /// Partial TSF no preference flag.
    pub partial_tsf_no_preference: bool,
    /// ASAP capable flag (responder only).
    pub asap_capable: bool,
    /// ASAP flag.
    pub asap: bool,
    /// FTM frames per burst, 0 to 31.
    pub ftms_per_burst: u8,
    /// Format and bandwidth (carried, not interpreted).
    pub format_and_bandwidth: u8,
    /// Burst period, in 100 ms units.
    pub burst_period: u16,
}

impl FtmParams {
    /// Parameters an initiator requests when nothing else is configured.
    ///
    /// Two bursts of two frames, 4 ms bursts spaced 200 ms apart, frames at
    /// least 400 us apart, ASAP.
    pub fn defaults() -> Self {
        Self {
            status_indication: StatusIndication::Reserved,
            status_value: 0,
            bursts_exponent: 1,
            burst_duration: 6,
            min_delta_ftm: 4,
            partial_tsf_timer: 0,
            partial_tsf_no_preference: true,
            asap_capable: false,
            asap: true,
            ftms_per_burst: 2,
            format_and_bandwidth: 0,
            burst_period: 2,
        }
    }

    /// Total number of bursts, `2^bursts_exponent`.
    pub fn number_of_bursts(&self) -> u32 {
        1u32 << (self.bursts_exponent & 0x0F)
    }

    /// Burst duration in microseconds.
    pub fn burst_duration_us(&self) -> u32 {
        decode_burst_duration(self.burst_duration)
    }

    /// Burst duration as a delay.
    pub fn burst_duration_delay(&self) -> Duration {
        Duration::from_micros(u64::from(self.burst_duration_us()))
    }

    /// Minimum spacing between FTM frames.
    pub fn min_delta_ftm_delay(&self) -> Duration {
        Duration::from_micros(u64::from(self.min_delta_ftm) * MIN_DELTA_FTM_UNIT_US)
    }

    /// Time between burst starts.
    pub fn burst_period_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.burst_period) * BURST_PERIOD_UNIT_MS)
    }

    /// Encoded size in bytes.
    pub const fn encoded_len(&self) -> usize {
        FTM_PARAMS_SIZE
    }

    /// Serialize to the 11-byte element.
    pub fn to_bytes(&self) -> [u8; FTM_PARAMS_SIZE] {
        let mut buf = [0u8; FTM_PARAMS_SIZE];
        buf[0] = FTM_PARAMS_ELEMENT_ID;
        buf[1] = FTM_PARAMS_TAG_LENGTH;
        buf[2] = self.status_indication.as_bits() | ((self.status_value & 0x1F) << 2);
        buf[3] = (self.bursts_exponent & 0x0F) | ((self.burst_duration & 0x0F) << 4);
        buf[4] = self.min_delta_ftm;
        buf[5..7].copy_from_slice(&self.partial_tsf_timer.to_be_bytes());
        buf[7] = u8::from(self.partial_tsf_no_preference)
            | (u8::from(self.asap_capable) << 1)
            | (u8::from(self.asap) << 2)
            | ((self.ftms_per_burst & 0x1F) << 3);
        buf[8] = self.format_and_bandwidth << 2;
        buf[9..11].copy_from_slice(&self.burst_period.to_be_bytes());
        buf
    }

    /// Append the encoded element to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_bytes());
    }

    /// Parse the element from the start of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < FTM_PARAMS_SIZE {
            return Err(HeaderError::TooShort {
                expected: FTM_PARAMS_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[0] != FTM_PARAMS_ELEMENT_ID {
            return Err(HeaderError::UnexpectedElement {
                expected: FTM_PARAMS_ELEMENT_ID,
                actual: bytes[0],
            });
        }
        if bytes[1] != FTM_PARAMS_TAG_LENGTH {
            return Err(HeaderError::InvalidLength {
                element: FTM_PARAMS_ELEMENT_ID,
                expected: FTM_PARAMS_TAG_LENGTH,
                actual: bytes[1],
            });
        }

        Ok(Self {
            status_indication: StatusIndication::from_bits(bytes[2]),
            status_value: (bytes[2] >> 2) & 0x1F,
            bursts_exponent: bytes[3] & 0x0F,
            burst_duration: bytes[3] >> 4,
            min_delta_ftm: bytes[4],
            partial_tsf_timer: u16::from_be_bytes([bytes[5], bytes[6]]),
            partial_tsf_no_preference: bytes[7] & 0x01 != 0,
            asap_capable: bytes[7] & 0x02 != 0,
            asap: bytes[7] & 0x04 != 0,
            ftms_per_burst: (bytes[7] >> 3) & 0x1F,
            format_and_bandwidth: bytes[8] >> 2,
            burst_period: u16::from_be_bytes([bytes[9], bytes[10]]),
        })
    }

    /// Whether `bytes` starts with a parameters element.
    pub(crate) fn is_next(bytes: &[u8]) -> bool {
        bytes.len() >= FTM_PARAMS_SIZE && bytes[0] == FTM_PARAMS_ELEMENT_ID
    }
}
