//! Index translation between the two ring index spaces.
//!
//! The host ring and the device ring have the same cardinality but may
//! be offset from each other by a fixed skew for the lifetime of the
//! binding: a device-side reset realigns the device ring to zero while
//! the host ring keeps its cursors. All skew arithmetic lives here;
//! reconcilers never compute it inline.

/// Cached translation between host-ring and device-ring slot indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMap {
    ofs: usize,
    num_slots: usize,
}

impl SlotMap {
    /// A map over two rings of `num_slots` slots where device index 0
    /// corresponds to host index `ofs`.
    pub fn new(ofs: usize, num_slots: usize) -> Self {
        debug_assert!(num_slots > 0);
        Self {
            ofs: ofs % num_slots,
            num_slots,
        }
    }

    /// Ring cardinality.
    #[inline]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Host index for a device index.
    #[inline]
    pub fn to_host(&self, device_idx: usize) -> usize {
        (device_idx + self.ofs) % self.num_slots
    }

    /// Device index for a host index.
    #[inline]
    pub fn to_device(&self, host_idx: usize) -> usize {
        (host_idx + self.num_slots - self.ofs) % self.num_slots
    }

    /// Circular successor.
    #[inline]
    pub fn next(&self, idx: usize) -> usize {
        if idx + 1 == self.num_slots {
            0
        } else {
            idx + 1
        }
    }

    /// Circular predecessor.
    #[inline]
    pub fn prev(&self, idx: usize) -> usize {
        if idx == 0 {
            self.num_slots - 1
        } else {
            idx - 1
        }
    }
}
