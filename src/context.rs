//! Current-network execution context.
//!
//! The run loop pushes the interface a slot belongs to before calling its
//! handler and pops it afterwards, so interface-scoped calls made by the
//! handler resolve to that interface without an explicit parameter.

use heapless::Vec;
use log::trace;

use crate::config::MAX_CONTEXT_DEPTH;
use crate::error::{Fault, Result};

/// Bounded stack of pushed interface indices.
#[derive(Debug, Default)]
pub struct NetworkContext {
    stack: Vec<u8, MAX_CONTEXT_DEPTH>,
}

impl NetworkContext {
    pub const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push(&mut self, network: u8) -> Result<()> {
        self.stack.push(network).map_err(|_| Fault::ContextOverflow)?;
        trace!("Context: push network {} (depth {})", network, self.stack.len());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u8> {
        let network = self.stack.pop().ok_or(Fault::ContextUnderflow)?;
        trace!("Context: pop network {} (depth {})", network, self.stack.len());
        Ok(network)
    }

    /// Innermost pushed interface, if any.
    pub fn current(&self) -> Option<u8> {
        self.stack.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}
