//! Device-presence verification for gated items.
//!
//! Platform keychains enforce presence checks themselves. The file and
//! memory backends have no such hardware, so they delegate the decision to
//! a [`PresenceVerifier`] supplied by the host.

use crate::error::Result;

/// Decides whether the user is present before a gated item is released.
pub trait PresenceVerifier: Send + Sync {
    /// Ask for presence. `reason` is a short human-readable prompt.
    ///
    /// `Ok(false)` means the user declined or failed the check.
    fn verify(&self, reason: &str) -> Result<bool>;
}

/// Always reports the user as present. For headless hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowPresence;

impl PresenceVerifier for AllowPresence {
    fn verify(&self, _reason: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Never reports the user as present; gated items become unreadable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyPresence;

impl PresenceVerifier for DenyPresence {
    fn verify(&self, reason: &str) -> Result<bool> {
        tracing::debug!(reason, "presence check denied by policy");
        Ok(false)
    }
}
