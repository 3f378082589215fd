//! Static network-stack adapter.
//!
//! Stands in for the radio stack on the host: a fixed endpoint table built
//! at start-up, plus a settable current network.  The endpoint order is
//! the dense index order.

use core::sync::atomic::{AtomicU8, Ordering};

use heapless::Vec;
use log::warn;

use crate::app::ports::StackPort;

/// Upper bound on configured endpoints.
pub const MAX_ENDPOINTS: usize = 16;

/// One endpoint table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EndpointEntry {
    endpoint: u8,
    network: u8,
}

/// Endpoint table and current network, without a radio.
#[derive(Debug, Default)]
pub struct StaticStack {
    endpoints: Vec<EndpointEntry, MAX_ENDPOINTS>,
    current: AtomicU8,
}

impl StaticStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `endpoint` on interface `network`.  Duplicates and entries
    /// past [`MAX_ENDPOINTS`] are dropped with a warning.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: u8, network: u8) -> Self {
        if self.endpoints.iter().any(|e| e.endpoint == endpoint) {
            warn!("Stack(sim): endpoint {} already configured", endpoint);
            return self;
        }
        if self.endpoints.push(EndpointEntry { endpoint, network }).is_err() {
            warn!("Stack(sim): endpoint table full, {} dropped", endpoint);
        }
        self
    }

    pub fn set_current_network(&self, network: u8) {
        self.current.store(network, Ordering::Release);
    }
}

impl StackPort for StaticStack {
    fn current_network_index(&self) -> u8 {
        self.current.load(Ordering::Acquire)
    }

    fn endpoint_count(&self) -> u8 {
        self.endpoints.len() as u8
    }

    fn endpoint_at(&self, index: u8) -> Option<u8> {
        self.endpoints.get(index as usize).map(|e| e.endpoint)
    }

    fn endpoint_index(&self, endpoint: u8) -> Option<u8> {
        self.endpoints
            .iter()
            .position(|e| e.endpoint == endpoint)
            .map(|i| i as u8)
    }

    fn endpoint_network_index(&self, endpoint: u8) -> Option<u8> {
        self.endpoints
            .iter()
            .find(|e| e.endpoint == endpoint)
            .map(|e| e.network)
    }
}
