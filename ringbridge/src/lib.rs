//! Descriptor-ring reconciliation engine for zero-copy packet I/O.
//!
//! Keeps two independently advancing views of the same circular packet
//! buffer in agreement: a client-visible slot ring and the NIC's hardware
//! descriptor ring. Each [`synchronize`] call runs to completion on the
//! caller's thread, moving descriptors and buffer ownership between the
//! two rings in one direction (send or receive) and notifying the device
//! exactly once per batch.
//!
//! # Design Philosophy
//!
//! - **Zero-copy**: slots reference buffers by index; the engine never
//!   touches payload bytes.
//! - **No allocation**: a sync call only reads and mutates pre-existing
//!   rings and cursors.
//! - **No locking on the hot path**: the caller guarantees one sync in
//!   flight per ring direction; distinct rings need no coordination.
//! - **External collaborators behind traits**: buffer address resolution,
//!   DMA visibility and link state are queried, never owned.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod error;
pub mod host;
pub mod mmio;
pub mod mode;
pub mod ring;
pub mod sync;
pub mod types;

pub use config::ReportPolicy;
pub use error::{BufferError, Result, SyncError};
pub use host::{BufferTable, LinkState};
pub use mmio::Doorbell;
pub use mode::{DeviceControl, ModeGate};
pub use ring::{DeviceQueue, HostRing, RingBinding, RxQueue, SlotMap, TxQueue};
pub use sync::{synchronize, SyncFlags, SyncStatus};
pub use types::{Direction, Slot, SlotFlags};
