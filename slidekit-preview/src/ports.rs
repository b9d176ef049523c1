//! Port selection for preview instances.

use std::collections::HashSet;

use crate::error::PreviewError;

/// Hands out ports from `base..=max` not held by a registered instance.
///
/// Ports are not probed at the OS level; a port taken by an unrelated
/// process shows up as a renderer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAllocator {
    base: u16,
    max: u16,
}

impl PortAllocator {
    pub fn new(base: u16, max: u16) -> Self {
        Self { base, max }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    /// Pick a port. An explicit request wins unless a live instance holds
    /// it; otherwise the lowest free port at or above the base.
    pub fn allocate(
        &self,
        requested: Option<u16>,
        in_use: &HashSet<u16>,
    ) -> Result<u16, PreviewError> {
        if let Some(port) = requested {
            if port == 0 {
                return Err(PreviewError::InvalidRequest("port must be non-zero".to_string()));
            }
            if in_use.contains(&port) {
                return Err(PreviewError::PortInUse(port));
            }
            return Ok(port);
        }
        (self.base..=self.max)
            .find(|port| !in_use.contains(port))
            .ok_or(PreviewError::PortsExhausted {
                base: self.base,
                max: self.max,
            })
    }
}
