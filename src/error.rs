//! Unified error types for the insulin pump simulator.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! command path's error handling uniform.  All variants are `Copy` so they
//! can be handed back through the device service without allocation.
//!
//! Blocked deliveries are deliberately *not* errors: the pump reports them
//! as [`BolusOutcome::Blocked`](crate::drivers::pump::BolusOutcome) and
//! logs a warning event.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the simulator funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A caller-supplied value was rejected; no state was mutated.
    Validation(ValidationError),
    /// The command is not valid in the device's current state.
    Command(CommandError),
    /// The deferred command queue could not accept the command.
    Queue(QueueError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Override dose outside (0, max].
    OverrideOutOfRange,
    /// Extended-bolus immediate percentage outside [0, 100].
    ExtendedPercentOutOfRange,
    /// Extended-bolus delay outside the configured minute range.
    ExtendedDelayOutOfRange,
    /// Simulation rate outside 1..=max.
    SimRateOutOfRange,
    /// Negative insulin units passed to an injection.
    NegativeUnits,
    /// Any other malformed input (negative carbs, NaN glucose, bad profile).
    InvalidInput(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverrideOutOfRange => write!(f, "override dose out of range"),
            Self::ExtendedPercentOutOfRange => write!(f, "extended percentage out of range"),
            Self::ExtendedDelayOutOfRange => write!(f, "extended delay out of range"),
            Self::SimRateOutOfRange => write!(f, "simulation rate out of range"),
            Self::NegativeUnits => write!(f, "negative insulin units"),
            Self::InvalidInput(what) => write!(f, "invalid input: {what}"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The device is powered off.
    DeviceOff,
    /// Unlock requested while the device is not on the lock screen.
    NotLocked,
    /// The device is on but not yet unlocked.
    DeviceLocked,
    /// Power-on refused because the battery is empty.
    BatteryDepleted,
    /// Delivery requested before any dose was calculated.
    NoRecommendation,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceOff => write!(f, "device is off"),
            Self::NotLocked => write!(f, "device is not locked"),
            Self::DeviceLocked => write!(f, "device is locked"),
            Self::BatteryDepleted => write!(f, "battery depleted"),
            Self::NoRecommendation => write!(f, "no dose has been calculated"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    Full,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "command queue full"),
        }
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
