//! Wired noise plus location-dependent bias.

use std::sync::Arc;

use crate::core::PositionSource;

use super::bias_map::BiasMap;
use super::wired::WiredErrorModel;
use super::{ErrorContext, ErrorModel};

/// Wireless RTT error: the bias at the node's current position plus
/// Gaussian noise.
///
/// Without a map or a bound node the model degrades to wired noise only.
pub struct WirelessErrorModel {
    wired: WiredErrorModel,
    map: Option<Arc<BiasMap>>,
    node: Option<Arc<dyn PositionSource>>,
}

impl WirelessErrorModel {
    /// Wrap a wired model with no map and no node bound.
    pub fn new(wired: WiredErrorModel) -> Self {
        Self {
            wired,
            map: None,
            node: None,
        }
    }

    /// Use `map` for bias lookup.
    pub fn with_map(mut self, map: Arc<BiasMap>) -> Self {
        self.map = Some(map);
        self
    }

    /// Look up bias at the position of `node`.
    pub fn with_node(mut self, node: Arc<dyn PositionSource>) -> Self {
        self.node = Some(node);
        self
    }

    /// Replace the bias map.
    pub fn set_map(&mut self, map: Option<Arc<BiasMap>>) {
        self.map = map;
    }

    /// Replace the bound node.
    pub fn set_node(&mut self, node: Option<Arc<dyn PositionSource>>) {
        self.node = node;
    }

    /// Bias map in use.
    pub fn map(&self) -> Option<&Arc<BiasMap>> {
        self.map.as_ref()
    }

    /// Underlying wired model.
    pub fn wired_mut(&mut self) -> &mut WiredErrorModel {
        &mut self.wired
    }

    fn current_bias(&self) -> Option<f64> {
        let map = self.map.as_ref()?;
        let pos = self.node.as_ref()?.position();
        Some(map.bias(pos.x, pos.y))
    }
}

impl ErrorModel for WirelessErrorModel {
    fn sample(&mut self, _ctx: &ErrorContext) -> i64 {
        let noise = self.wired.draw();
        match self.current_bias() {
            Some(bias) => (bias + noise as f64) as i64,
            None => noise,
        }
    }
}
