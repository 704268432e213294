//! FTM request header.

use crate::core::{FTM_REQUEST_HEADER_SIZE, HeaderError};

use super::params::FtmParams;

/// Header of an initial or trigger FTM request.
///
/// A trigger of 1 with parameters starts (or renegotiates) a session, 1
/// without parameters asks for the next frame of the running burst, and 0
/// ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FtmRequestHeader {
    /// Trigger field.
    pub trigger: u8,
    /// Parameters element, present on initial requests.
    pub params: Option<FtmParams>,
}

impl FtmRequestHeader {
    /// Initial request carrying parameters.
    pub fn initial(params: FtmParams) -> Self {
        Self {
            trigger: 1,
            params: Some(params),
        }
    }

    /// Trigger for the next burst, without parameters.
    pub fn trigger() -> Self {
        Self {
            trigger: 1,
            params: None,
        }
    }

    /// Session termination request.
    pub fn stop() -> Self {
        Self {
            trigger: 0,
            params: None,
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        FTM_REQUEST_HEADER_SIZE + self.params.map_or(0, |p| p.encoded_len())
    }

    /// Append the encoded header to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.trigger);
        if let Some(params) = &self.params {
            params.encode(buf);
        }
    }

    /// Parse a header from the start of `bytes`, returning it with the bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), HeaderError> {
        if bytes.len() < FTM_REQUEST_HEADER_SIZE {
            return Err(HeaderError::TooShort {
                expected: FTM_REQUEST_HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let trigger = bytes[0];
        let rest = &bytes[FTM_REQUEST_HEADER_SIZE..];
        let params = if FtmParams::is_next(rest) {
            Some(FtmParams::from_bytes(rest)?)
        } else {
            None
        };
        let header = Self { trigger, params };
        Ok((header, header.encoded_len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_request_vector() {
        let mut buf = Vec::new();
        FtmRequestHeader::initial(FtmParams::defaults()).encode(&mut buf);
        assert_eq!(hex::encode(&buf), "01ce09006104000015000002");

        let (header, used) = FtmRequestHeader::decode(&buf).unwrap();
        assert_eq!(used, 12);
        assert_eq!(header.params, Some(FtmParams::defaults()));
    }

    #[test]
    fn test_trigger_without_params() {
        let (header, used) = FtmRequestHeader::decode(&[0x01]).unwrap();
        assert_eq!(used, 1);
        assert_eq!(header, FtmRequestHeader::trigger());
    }

    #[test]
    fn test_unknown_trailing_element_is_not_params() {
        // Eleven bytes follow but they do not start with element 206.
        let bytes = hex::decode("00dd09000000000000000000").unwrap();
        let (header, used) = FtmRequestHeader::decode(&bytes).unwrap();
        assert_eq!(header, FtmRequestHeader::stop());
        assert_eq!(used, 1);
    }

    #[test]
    fn test_empty_buffer() {
        assert!(matches!(
            FtmRequestHeader::decode(&[]),
            Err(HeaderError::TooShort { expected: 1, actual: 0 })
        ));
    }
}
