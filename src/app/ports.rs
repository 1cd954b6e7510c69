//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Device (domain)
//! ```
//!
//! Driven adapters (fault signals, event sinks, config storage, profile
//! store) implement these traits.  The [`Device`](super::service::Device)
//! consumes them via generics, so the domain core never performs I/O.
//!
//! ## Contract notes
//!
//! - **EventSink** is fire-and-forget: the core never waits on it and
//!   never rolls back because a sink failed to persist something.
//! - **ConfigPort** implementations MUST validate before persisting.

use core::fmt;

use crate::config::SystemConfig;
use crate::profile::Profile;

// ───────────────────────────────────────────────────────────────
// Fault signal port (driven adapter: hardware status → domain)
// ───────────────────────────────────────────────────────────────

/// External fault lines, sampled once per tick.
pub trait FaultSignals {
    /// `false` when the CGM transmitter link is lost.
    fn cgm_link_up(&self) -> bool;

    /// `true` while the pump hardware reports an error (occlusion).
    fn pump_error(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DeviceEvent`](super::events::DeviceEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::DeviceEvent);
}

// ───────────────────────────────────────────────────────────────
// Profile source (driven adapter: profile store → domain)
// ───────────────────────────────────────────────────────────────

/// Read-only access to the profile the user selected.
pub trait ProfileSource {
    fn active_profile(&self) -> Profile;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Invalid values must be rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`SystemConfig::default()`] if none is stored.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The backing store could not be read or written.
    Io,
    /// Stored data could not be parsed.
    Corrupted,
    /// A value failed range validation.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "config storage I/O failed"),
            Self::Corrupted => write!(f, "stored config is corrupted"),
            Self::ValidationFailed(what) => write!(f, "config validation failed: {what}"),
        }
    }
}

impl std::error::Error for ConfigError {}
