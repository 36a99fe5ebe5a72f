//! Reconciler tuning knobs.

/// TX completion-report cadence.
///
/// Completion interrupts on every packet are expensive, so the TX
/// reconciler requests a device report only every `interval` device
/// slots, plus wherever the client asks explicitly. The default of half
/// the ring bounds the amortized cost at roughly two reports per full
/// ring traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPolicy {
    interval: usize,
}

impl ReportPolicy {
    /// Report every `interval` device slots; `0` disables periodic
    /// reports (explicit per-slot requests are still honored).
    pub const fn every(interval: usize) -> Self {
        Self { interval }
    }

    /// Default policy: report at the ring start and the half point.
    pub const fn half_ring(num_slots: usize) -> Self {
        Self {
            interval: num_slots / 2,
        }
    }

    /// True if a report should be requested at this device index.
    #[inline]
    pub fn wants_report(&self, device_idx: usize) -> bool {
        self.interval != 0 && device_idx % self.interval == 0
    }
}
