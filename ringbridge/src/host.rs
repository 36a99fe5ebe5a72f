//! External collaborator interfaces.
//!
//! The reconcilers never own buffers, mappings or link management; they
//! query them through these traits once per call.

use crate::error::BufferError;
use crate::types::{Direction, Slot};

/// Buffer-index-to-address mapping table plus DMA visibility hooks.
///
/// Implemented by the memory subsystem that allocated the packet buffers.
pub trait BufferTable {
    /// Physical/bus address of the slot's buffer.
    ///
    /// Fails with [`BufferError::InvalidBuffer`] when the slot carries
    /// the reserved invalid buffer index.
    fn resolve(&self, dir: Direction, slot: &Slot) -> core::result::Result<u64, BufferError>;

    /// Length capacity of every buffer in the table.
    fn buf_capacity(&self) -> usize;

    /// Make `len` bytes at `paddr` visible to the CPU after device
    /// writes. No-op on cache-coherent platforms.
    fn sync_for_cpu(&self, _dir: Direction, _paddr: u64, _len: usize) {}

    /// Make `len` bytes at `paddr` visible to the device before it
    /// reads. No-op on cache-coherent platforms.
    fn sync_for_device(&self, _dir: Direction, _paddr: u64, _len: usize) {}
}

/// Link and interface state, queried once per sync call.
pub trait LinkState {
    /// Carrier present. TX syncs are silent no-ops without it.
    fn carrier_ok(&self) -> bool;

    /// Interface administratively running. RX syncs are silent no-ops
    /// without it.
    fn is_running(&self) -> bool;
}
