//! The synchronization entry point.

mod rx;
mod tx;

use bitflags::bitflags;

use crate::error::{Result, SyncError};
use crate::host::{BufferTable, LinkState};
use crate::ring::RingBinding;
use crate::types::Direction;

bitflags! {
    /// Per-call sync options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SyncFlags: u32 {
        /// Check for new device completions even if no interrupt was
        /// noted on the binding.
        const FORCE_READ = 1 << 0;
    }
}

/// Outcome of a successful sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Cursors reconciled (possibly nothing to do).
    Synced,
    /// Link down or interface not running; nothing was done. Not an
    /// error, retried on a later call.
    LinkDown,
    /// An invariant violation forced a ring reinitialization. All
    /// cursors are zero and the ring needs a full re-arm.
    Reset,
}

/// Reconcile the host and device views of one ring.
///
/// The sole entry point. The caller guarantees at most one call in
/// flight per ring-direction pair; distinct rings may be synced
/// concurrently without coordination. Runs to completion on the caller's
/// thread, bounded by one pass over at most N slots per phase.
pub fn synchronize<B: BufferTable, L: LinkState>(
    binding: &mut RingBinding,
    direction: Direction,
    buffers: &B,
    link: &L,
    flags: SyncFlags,
) -> Result<SyncStatus> {
    if direction != binding.direction() {
        return Err(SyncError::DirectionMismatch);
    }
    match direction {
        Direction::Tx => tx::txsync(binding, buffers, link),
        Direction::Rx => rx::rxsync(binding, buffers, link, flags),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use core::ptr::NonNull;
    use std::boxed::Box;
    use std::vec;
    use std::vec::Vec;

    use crate::error::BufferError;
    use crate::host::{BufferTable, LinkState};
    use crate::mmio::Doorbell;
    use crate::ring::{DeviceQueue, HostRing, RingBinding, RxQueue, TxQueue};
    use crate::types::desc::{RxDesc, TxDesc};
    use crate::types::{Direction, Slot};

    /// Buffer index 0 is the reserved invalid marker.
    pub const INVALID_BUF: u32 = 0;
    pub const BUF_CAPACITY: usize = 2048;
    pub const BUF_BASE: u64 = 0x10_0000;

    /// Flat fake buffer table: index `i` lives at `BUF_BASE + i * cap`.
    pub struct Table;

    impl BufferTable for Table {
        fn resolve(&self, _dir: Direction, slot: &Slot) -> Result<u64, BufferError> {
            if slot.buf_idx == INVALID_BUF {
                return Err(BufferError::InvalidBuffer);
            }
            Ok(BUF_BASE + slot.buf_idx as u64 * BUF_CAPACITY as u64)
        }

        fn buf_capacity(&self) -> usize {
            BUF_CAPACITY
        }
    }

    pub struct Link {
        pub carrier: bool,
        pub running: bool,
    }

    impl Default for Link {
        fn default() -> Self {
            Self {
                carrier: true,
                running: true,
            }
        }
    }

    impl LinkState for Link {
        fn carrier_ok(&self) -> bool {
            self.carrier
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    /// In-memory TX ring pair plus its binding.
    pub struct TxHarness {
        pub slots: Vec<Slot>,
        pub descs: Vec<TxDesc>,
        pub tail_reg: Box<u32>,
        pub binding: RingBinding,
    }

    pub fn tx_harness(n: usize, skew: usize) -> TxHarness {
        let mut slots: Vec<Slot> = (0..n)
            .map(|i| Slot {
                buf_idx: i as u32 + 1,
                ..Slot::default()
            })
            .collect();
        let mut descs: Vec<TxDesc> = vec![TxDesc::default(); n + 1];
        let mut tail_reg = Box::new(0u32);

        let host = unsafe { HostRing::new(NonNull::new(slots.as_mut_ptr()).unwrap(), n) };
        let doorbell =
            unsafe { Doorbell::new(NonNull::new(&mut *tail_reg as *mut u32).unwrap()) };
        let queue =
            unsafe { TxQueue::new(NonNull::new(descs.as_mut_ptr()).unwrap(), n, doorbell) };
        let binding = RingBinding::new(host, DeviceQueue::Tx(queue), skew);

        TxHarness {
            slots,
            descs,
            tail_reg,
            binding,
        }
    }

    impl TxHarness {
        /// Emulate the device consuming descriptors up to `head`
        /// (exclusive) by updating the head write-back word.
        pub fn device_complete(&mut self, head: usize) {
            let n = self.descs.len() - 1;
            let word = core::ptr::addr_of_mut!(self.descs[n]) as *mut u32;
            unsafe { word.write_volatile((head as u32).to_le()) };
        }

        pub fn tail(&self) -> u32 {
            u32::from_le(*self.tail_reg)
        }

        pub fn expected_paddr(&self, slot_idx: usize) -> u64 {
            BUF_BASE + self.slots[slot_idx].buf_idx as u64 * BUF_CAPACITY as u64
        }
    }

    /// In-memory RX ring pair plus its binding.
    pub struct RxHarness {
        pub slots: Vec<Slot>,
        pub descs: Vec<RxDesc>,
        pub tail_reg: Box<u32>,
        pub binding: RingBinding,
    }

    pub fn rx_harness(n: usize, skew: usize) -> RxHarness {
        let mut slots: Vec<Slot> = (0..n)
            .map(|i| Slot {
                buf_idx: i as u32 + 1,
                ..Slot::default()
            })
            .collect();
        let mut descs: Vec<RxDesc> = vec![RxDesc::default(); n];
        let mut tail_reg = Box::new(0u32);

        let host = unsafe { HostRing::new(NonNull::new(slots.as_mut_ptr()).unwrap(), n) };
        let doorbell =
            unsafe { Doorbell::new(NonNull::new(&mut *tail_reg as *mut u32).unwrap()) };
        let queue =
            unsafe { RxQueue::new(NonNull::new(descs.as_mut_ptr()).unwrap(), n, doorbell) };
        let binding = RingBinding::new(host, DeviceQueue::Rx(queue), skew);

        RxHarness {
            slots,
            descs,
            tail_reg,
            binding,
        }
    }

    impl RxHarness {
        /// Emulate the device writing back one completed descriptor.
        pub fn device_deliver(&mut self, dev_idx: usize, len: u16, eop: bool) {
            let wb = RxDesc::write_back(len, eop);
            unsafe { core::ptr::addr_of_mut!(self.descs[dev_idx].wb).write_volatile(wb) };
        }

        pub fn tail(&self) -> u32 {
            u32::from_le(*self.tail_reg)
        }
    }
}
