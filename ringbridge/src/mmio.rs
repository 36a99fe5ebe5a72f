//! Memory barriers and the device tail register.

use core::ptr::NonNull;
use core::sync::atomic::{fence, Ordering};

/// Full store barrier. Everything stored before this is visible to the
/// device before anything stored after it.
#[inline]
pub fn wmb() {
    fence(Ordering::SeqCst);
}

/// Load barrier. Orders a device write-back read before the dependent
/// buffer reads behind it.
#[inline]
pub fn rmb() {
    fence(Ordering::Acquire);
}

/// Write-only ring tail register, one per direction per queue.
///
/// Writes are fire-and-forget; no acknowledgment read exists. The caller
/// is responsible for the [`wmb`] that must precede every notification.
#[derive(Debug)]
pub struct Doorbell {
    reg: NonNull<u32>,
}

impl Doorbell {
    /// # Safety
    /// `reg` must point to the queue's mapped tail register (or a plain
    /// in-memory word for software devices) and remain valid for the
    /// lifetime of the queue that owns this doorbell.
    pub unsafe fn new(reg: NonNull<u32>) -> Self {
        Self { reg }
    }

    /// Notify the device of a new tail index (exclusive).
    #[inline]
    pub fn ring(&self, tail: u32) {
        unsafe { self.reg.as_ptr().write_volatile(tail.to_le()) }
    }
}

// Safety: the doorbell only holds an MMIO pointer that stays valid for
// the owning queue's lifetime.
unsafe impl Send for Doorbell {}
