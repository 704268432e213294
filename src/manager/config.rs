//! Manager configuration.

use std::time::Duration;

use crate::core::{DEFAULT_PREAMBLE_DETECTION, MacAddress};
use crate::session::SessionConfig;
use crate::wire::FtmParams;

/// Configuration of an [`FtmManager`](super::FtmManager).
///
/// | Option | Effect |
/// |---|---|
/// | `address` | own station address; frames to other stations are ignored |
/// | `preamble_detection` | handed to every session for the RTT correction |
/// | `default_params` | requested by initiators, fills no-preference fields on responders |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManagerConfig {
    /// Own station address.
    pub address: MacAddress,

    /// Preamble detection duration of the PHY.
    pub preamble_detection: Duration,

    /// Default FTM parameters for new sessions.
    pub default_params: FtmParams,
}

impl ManagerConfig {
    /// Defaults for a station with `address`.
    pub fn new(address: MacAddress) -> Self {
        Self {
            address,
            preamble_detection: DEFAULT_PREAMBLE_DETECTION,
            default_params: FtmParams::defaults(),
        }
    }

    /// Configuration handed to each new session.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            default_params: self.default_params,
            preamble_detection: self.preamble_detection,
        }
    }
}

/// Builder for [`ManagerConfig`].
#[derive(Debug)]
pub struct ManagerConfigBuilder {
    config: ManagerConfig,
}

impl ManagerConfigBuilder {
    /// Start from the defaults for `address`.
    pub fn new(address: MacAddress) -> Self {
        Self {
            config: ManagerConfig::new(address),
        }
    }

    /// Set the preamble detection duration.
    pub fn preamble_detection(mut self, duration: Duration) -> Self {
        self.config.preamble_detection = duration;
        self
    }

    /// Set the default FTM parameters.
    pub fn default_params(mut self, params: FtmParams) -> Self {
        self.config.default_params = params;
        self
    }

    /// Finish.
    pub fn build(self) -> ManagerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let params = FtmParams {
            ftms_per_burst: 8,
            ..FtmParams::defaults()
        };
        let config = ManagerConfigBuilder::new(MacAddress::from_index(3))
            .preamble_detection(Duration::from_micros(8))
            .default_params(params)
            .build();
        assert_eq!(config.address, MacAddress::from_index(3));

        let session = config.session_config();
        assert_eq!(session.preamble_detection, Duration::from_micros(8));
        assert_eq!(session.default_params.ftms_per_burst, 8);
    }

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::new(MacAddress::from_index(1));
        assert_eq!(config.preamble_detection, Duration::from_micros(4));
        assert_eq!(config.default_params, FtmParams::defaults());
    }
}
