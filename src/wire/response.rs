//! FTM response header (the FTM frame proper).
//!
//! Wire format (18 bytes + optional parameters):
//! ```text
//! +-------+-----------+--------+--------+----------+----------+----------+
//! | token | follow-up | TOD    | TOA    | TOD err  | TOA err  | params?  |
//! | 1 B   | 1 B       | 6 B LE | 6 B LE | 2 B (BE) | 2 B (BE) | 11 B     |
//! +-------+-----------+--------+--------+----------+----------+----------+
//! ```

use crate::core::{FTM_RESPONSE_HEADER_SIZE, HeaderError, TIMESTAMP_MASK, TIMESTAMP_SIZE};

use super::params::FtmParams;

/// Header of an FTM frame sent by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FtmResponseHeader {
    /// Dialog token of this frame. 0 ends the session.
    pub dialog_token: u8,
    /// Token of the earlier dialog whose timestamps this frame carries, or 0.
    pub follow_up_dialog_token: u8,
    /// Time of departure of the follow-up dialog's FTM frame (its T1).
    pub time_of_departure: u64,
    /// Time of arrival of the follow-up dialog's ack (its T4).
    pub time_of_arrival: u64,
    /// Max error of the time of departure.
    pub time_of_departure_error: u16,
    /// Max error of the time of arrival.
    pub time_of_arrival_error: u16,
    /// Parameters element, present on the reply to an initial request.
    pub params: Option<FtmParams>,
}

impl FtmResponseHeader {
    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        FTM_RESPONSE_HEADER_SIZE + self.params.map_or(0, |p| p.encoded_len())
    }

    /// Append the encoded header to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.dialog_token);
        buf.push(self.follow_up_dialog_token);
        write_timestamp(buf, self.time_of_departure);
        write_timestamp(buf, self.time_of_arrival);
        buf.extend_from_slice(&self.time_of_departure_error.to_be_bytes());
        buf.extend_from_slice(&self.time_of_arrival_error.to_be_bytes());
        if let Some(params) = &self.params {
            params.encode(buf);
        }
    }

    /// Parse a header from the start of `bytes`, returning it with the bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), HeaderError> {
        if bytes.len() < FTM_RESPONSE_HEADER_SIZE {
            return Err(HeaderError::TooShort {
                expected: FTM_RESPONSE_HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let rest = &bytes[FTM_RESPONSE_HEADER_SIZE..];
        let params = if FtmParams::is_next(rest) {
            Some(FtmParams::from_bytes(rest)?)
        } else {
            None
        };

        let header = Self {
            dialog_token: bytes[0],
            follow_up_dialog_token: bytes[1],
            time_of_departure: read_timestamp(&bytes[2..8]),
            time_of_arrival: read_timestamp(&bytes[8..14]),
            time_of_departure_error: u16::from_be_bytes([bytes[14], bytes[15]]),
            time_of_arrival_error: u16::from_be_bytes([bytes[16], bytes[17]]),
            params,
        };
        Ok((header, header.encoded_len()))
    }
}

fn write_timestamp(buf: &mut Vec<u8>, ts: u64) {
    buf.extend_from_slice(&(ts & TIMESTAMP_MASK).to_le_bytes()[..TIMESTAMP_SIZE]);
}

fn read_timestamp(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw[..TIMESTAMP_SIZE].copy_from_slice(&bytes[..TIMESTAMP_SIZE]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_up_vector() {
        let header = FtmResponseHeader {
            dialog_token: 3,
            follow_up_dialog_token: 2,
            time_of_departure: 0x0102_0304_0506,
            time_of_arrival: 0xA0B0_C0D0_E0F0,
            ..Default::default()
        };
        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert_eq!(
            hex::encode(&buf),
            "0302060504030201f0e0d0c0b0a000000000"
        );

        let (decoded, used) = FtmResponseHeader::decode(&buf).unwrap();
        assert_eq!(used, 18);
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_timestamps_are_truncated_to_48_bits() {
        let header = FtmResponseHeader {
            dialog_token: 1,
            time_of_departure: 0xFFFF_0000_0000_0001,
            ..Default::default()
        };
        let mut buf = Vec::new();
        header.encode(&mut buf);
        let (decoded, _) = FtmResponseHeader::decode(&buf).unwrap();
        assert_eq!(decoded.time_of_departure, 1);
    }

    #[test]
    fn test_with_params() {
        let header = FtmResponseHeader {
            dialog_token: 1,
            params: Some(FtmParams::defaults()),
            ..Default::default()
        };
        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), 29);
        assert_eq!(header.encoded_len(), 29);

        let (decoded, used) = FtmResponseHeader::decode(&buf).unwrap();
        assert_eq!(used, 29);
        assert_eq!(decoded.params, Some(FtmParams::defaults()));
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            FtmResponseHeader::decode(&[0u8; 10]),
            Err(HeaderError::TooShort { expected: 18, actual: 10 })
        ));
    }
}
