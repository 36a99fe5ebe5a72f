//! Shared data types.
//!
//! The client-visible slot layout and the flag vocabulary shared between
//! the client, the reconcilers and the descriptor encoders.

pub mod desc;

pub use desc::{RxDesc, TxDesc};

use bitflags::bitflags;

/// Ring direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client-produced data flows to the device.
    Tx,
    /// Device-produced data flows to the client.
    Rx,
}

bitflags! {
    /// Per-slot flags, written by the client and consumed (then cleared)
    /// by the reconcilers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SlotFlags: u16 {
        /// Packet continues in the next slot.
        const MORE_FRAG = 1 << 0;
        /// Buffer index was swapped by the client since the last sync.
        const BUF_CHANGED = 1 << 1;
        /// Client wants a completion report for this slot.
        const REPORT = 1 << 2;
    }
}

/// One client-visible packet slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Slot {
    /// Index into the external buffer table.
    pub buf_idx: u32,
    /// Payload length in bytes.
    pub len: u16,
    /// Slot flags.
    pub flags: SlotFlags,
    /// Client-chosen payload offset inside the buffer.
    pub offset: u64,
}
