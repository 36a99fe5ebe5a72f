//! Synchronization error types.

use core::fmt;

pub type Result<T> = core::result::Result<T, SyncError>;

/// Errors reported by a synchronization call.
///
/// Invariant violations are deliberately *not* errors: they trigger a
/// ring reinitialization and surface as
/// [`SyncStatus::Reset`](crate::sync::SyncStatus::Reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// Device descriptor ring handle missing or uninitialized. No state
    /// was mutated; retry once the device side is (re)attached.
    DeviceUnavailable,
    /// Requested direction disagrees with the ring binding.
    DirectionMismatch,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable => write!(f, "device ring missing or uninitialized"),
            Self::DirectionMismatch => write!(f, "sync direction does not match ring binding"),
        }
    }
}

/// Address-resolution failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The slot's buffer index is the reserved "invalid" marker.
    InvalidBuffer,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBuffer => write!(f, "slot references the invalid buffer marker"),
        }
    }
}
