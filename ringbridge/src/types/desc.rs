//! Hardware descriptor layouts.
//!
//! `#[repr(C)]` structures shared with the packet-moving device. Field
//! order and width are load-bearing. Every device-visible access goes
//! through volatile loads/stores with little-endian conversion; the
//! device may be fetching or writing back neighbouring descriptors at
//! any time.

use core::ptr;

// ═══════════════════════════════════════════════════════════════════════════
// TX DESCRIPTOR
// ═══════════════════════════════════════════════════════════════════════════

/// Command bits start at this shift inside `cmd_type_len`.
pub const TXD_CMD_S: u64 = 4;
/// Buffer length starts at this shift inside `cmd_type_len`.
pub const TXD_LEN_S: u64 = 34;
/// Descriptor ends a packet.
pub const TXD_CMD_EOP: u64 = 0x1;
/// Device reports completion status for this descriptor.
pub const TXD_CMD_RS: u64 = 0x2;

/// Transmit descriptor: buffer address plus a command/type/length qword.
///
/// Written by the TX reconciler, read by the device.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TxDesc {
    /// Physical/bus address of the payload.
    pub buf_addr: u64,
    /// Command, type and buffer-length fields.
    pub cmd_type_len: u64,
}

impl TxDesc {
    /// Encode address, length and command bits into the descriptor.
    pub fn write(&mut self, addr: u64, len: u16, cmd: u64) {
        let qw1 = ((len as u64) << TXD_LEN_S) | (cmd << TXD_CMD_S);
        unsafe {
            ptr::addr_of_mut!(self.buf_addr).write_volatile(addr.to_le());
            ptr::addr_of_mut!(self.cmd_type_len).write_volatile(qw1.to_le());
        }
    }

    /// Decoded buffer address.
    pub fn addr(&self) -> u64 {
        u64::from_le(self.buf_addr)
    }

    /// Decoded buffer length.
    pub fn len(&self) -> u16 {
        ((u64::from_le(self.cmd_type_len) >> TXD_LEN_S) & 0xffff) as u16
    }

    /// True if all of the given command bits are set.
    pub fn has_cmd(&self, cmd: u64) -> bool {
        (u64::from_le(self.cmd_type_len) >> TXD_CMD_S) & cmd == cmd
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RX DESCRIPTOR
// ═══════════════════════════════════════════════════════════════════════════

/// Descriptor has been written back by the device ("data valid").
pub const RXD_STAT_DD: u64 = 1 << 0;
/// Descriptor ends a packet.
pub const RXD_STAT_EOP: u64 = 1 << 1;
/// Packet length starts at this shift inside the write-back qword.
pub const RXD_LEN_S: u64 = 32;

/// Receive descriptor.
///
/// The RX reconciler writes the read format (`pkt_addr`, cleared `wb`);
/// the device overwrites `wb` with status and packet length.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RxDesc {
    /// Physical/bus address of the receive buffer.
    pub pkt_addr: u64,
    /// Device write-back word: status bits plus packet length.
    pub wb: u64,
}

impl RxDesc {
    /// Arm the descriptor with a fresh buffer: set the address and clear
    /// the device status so the device will refill it.
    pub fn arm(&mut self, addr: u64) {
        unsafe {
            ptr::addr_of_mut!(self.pkt_addr).write_volatile(addr.to_le());
            ptr::addr_of_mut!(self.wb).write_volatile(0);
        }
    }

    /// Decoded write-back qword. Volatile: the field is device-owned
    /// until the descriptor is reclaimed.
    pub fn status(&self) -> u64 {
        u64::from_le(unsafe { ptr::addr_of!(self.wb).read_volatile() })
    }

    /// Compose a write-back qword in stored (little-endian) form, as the
    /// device would. Used by software device emulations.
    pub fn write_back(len: u16, eop: bool) -> u64 {
        let mut wb = RXD_STAT_DD | ((len as u64) << RXD_LEN_S);
        if eop {
            wb |= RXD_STAT_EOP;
        }
        wb.to_le()
    }
}
