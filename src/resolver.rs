//! Multiplexing resolver.
//!
//! Maps a logical event plus an optional endpoint selector to the
//! physical slot every scheduling primitive operates on.  Callers use one
//! name for the event; the resolver picks the replica for the current
//! network or for the given endpoint.

use crate::app::ports::StackPort;
use crate::error::{Fault, Result};
use crate::events::{Catalog, EventId, Multiplex, SlotId};

/// Inputs the resolver needs besides the catalog.
#[derive(Debug, Clone, Copy)]
pub struct ResolveEnv {
    /// Interface the caller is currently operating on.
    pub current_network: u8,
    /// Number of interfaces the build supports.
    pub supported_networks: u8,
}

/// Resolve `event` (and optionally `endpoint`) to a concrete slot.
pub fn resolve<A, S: StackPort + ?Sized>(
    catalog: &Catalog<A>,
    stack: &S,
    env: ResolveEnv,
    event: EventId,
    endpoint: Option<u8>,
) -> Result<SlotId> {
    let desc = catalog.descriptor(event)?;
    if desc.replicas == 0 {
        return Err(Fault::NoReplicas);
    }

    if let Some(ep) = endpoint {
        let Multiplex::Endpoint { base } = desc.mux else {
            return Err(Fault::NotEndpointEvent);
        };
        let dense = stack.endpoint_index(ep).ok_or(Fault::UnknownEndpoint(ep))?;
        return offset_slot(desc.first_slot, desc.replicas, base, dense);
    }

    match desc.mux {
        Multiplex::Network { base } => {
            if env.supported_networks == 1 && base != 0 {
                return Err(Fault::NetworkIndexMismatch);
            }
            offset_slot(desc.first_slot, desc.replicas, base, env.current_network)
        }
        Multiplex::Global | Multiplex::Endpoint { .. } => Ok(desc.first_slot),
    }
}

fn offset_slot(first: SlotId, replicas: u8, base: u8, index: u8) -> Result<SlotId> {
    let offset = index.checked_sub(base).ok_or(Fault::ReplicaOutOfRange)?;
    if offset >= replicas {
        return Err(Fault::ReplicaOutOfRange);
    }
    Ok(SlotId(first.0 + offset))
}
