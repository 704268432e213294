//! TSF sync info element.

use crate::core::{
    HeaderError, TSF_SYNC_ELEMENT_ID, TSF_SYNC_ELEMENT_ID_EXTENSION, TSF_SYNC_LENGTH,
    TSF_SYNC_SIZE,
};

/// TSF synchronization info, attached to the first FTM frame of each burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TsfSyncInfo {
    /// TSF sync value.
    pub tsf_sync: u32,
}

impl TsfSyncInfo {
    /// Encoded size in bytes.
    pub const fn encoded_len(&self) -> usize {
        TSF_SYNC_SIZE
    }

    /// Append the encoded element to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(TSF_SYNC_ELEMENT_ID);
        buf.push(TSF_SYNC_LENGTH);
        buf.push(TSF_SYNC_ELEMENT_ID_EXTENSION);
        buf.extend_from_slice(&self.tsf_sync.to_be_bytes());
    }

    /// Parse the element from the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < TSF_SYNC_SIZE {
            return Err(HeaderError::TooShort {
                expected: TSF_SYNC_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[0] != TSF_SYNC_ELEMENT_ID {
            return Err(HeaderError::UnexpectedElement {
                expected: TSF_SYNC_ELEMENT_ID,
                actual: bytes[0],
            });
        }
        if bytes[1] != TSF_SYNC_LENGTH {
            return Err(HeaderError::InvalidLength {
                element: TSF_SYNC_ELEMENT_ID,
                expected: TSF_SYNC_LENGTH,
                actual: bytes[1],
            });
        }
        if bytes[2] != TSF_SYNC_ELEMENT_ID_EXTENSION {
            return Err(HeaderError::InvalidExtension(bytes[2]));
        }
        Ok(Self {
            tsf_sync: u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector() {
        let mut buf = Vec::new();
        TsfSyncInfo { tsf_sync: 0x0000_1234 }.encode(&mut buf);
        assert_eq!(hex::encode(&buf), "ff050900001234");
        assert_eq!(TsfSyncInfo::decode(&buf).unwrap().tsf_sync, 0x1234);
    }

    #[test]
    fn test_wrong_extension() {
        let bytes = hex::decode("ff050a00000000").unwrap();
        assert_eq!(
            TsfSyncInfo::decode(&bytes),
            Err(HeaderError::InvalidExtension(0x0a))
        );
    }
}
