//! Ring state: the client-visible host ring, the device queue handles
//! and the binding the reconcilers operate on.
//!
//! Neither ring is allocated here. Both are created by the attach layer
//! during device-ring initialization and torn down together; this module
//! only reads and mutates cursors and descriptor contents within a sync
//! call.

pub mod index;

pub use index::SlotMap;

use core::ptr::NonNull;

use log::warn;

use crate::config::ReportPolicy;
use crate::mmio::Doorbell;
use crate::types::desc::{RxDesc, TxDesc};
use crate::types::{Direction, Slot};

// ═══════════════════════════════════════════════════════════════════════════
// HOST RING
// ═══════════════════════════════════════════════════════════════════════════

/// Client-visible circular slot array with its three cursors.
///
/// `head` is advanced by the client between sync calls; `hwcur` and
/// `hwtail` are owned by the reconcilers. The region `[hwtail, hwcur)`
/// (mod N) is device-owned; every other slot belongs to the client.
pub struct HostRing {
    slots: NonNull<Slot>,
    num_slots: usize,
    /// Client-supplied boundary of slots ready to send (TX) or safe to
    /// reuse (RX).
    pub head: usize,
    /// First slot not yet handed to the device (TX) / not yet released
    /// back to the device (RX).
    pub(crate) hwcur: usize,
    /// Boundary up to which the device has produced data or freed
    /// buffers visible to the client.
    pub(crate) hwtail: usize,
}

impl HostRing {
    /// # Safety
    /// `slots` must point to `num_slots` initialized slots that outlive
    /// the ring and are not touched by the client while a sync call is
    /// in flight.
    pub unsafe fn new(slots: NonNull<Slot>, num_slots: usize) -> Self {
        Self {
            slots,
            num_slots,
            head: 0,
            hwcur: 0,
            hwtail: 0,
        }
    }

    /// Ring cardinality.
    #[inline]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// First slot not yet handed to (TX) or released back to (RX) the
    /// device.
    #[inline]
    pub fn hwcur(&self) -> usize {
        self.hwcur
    }

    /// Device-confirmed boundary visible to the client.
    #[inline]
    pub fn hwtail(&self) -> usize {
        self.hwtail
    }

    #[inline]
    pub fn slot(&self, idx: usize) -> &Slot {
        debug_assert!(idx < self.num_slots);
        unsafe { &*self.slots.as_ptr().add(idx) }
    }

    #[inline]
    pub fn slot_mut(&mut self, idx: usize) -> &mut Slot {
        debug_assert!(idx < self.num_slots);
        unsafe { &mut *self.slots.as_ptr().add(idx) }
    }
}

// Safety: HostRing only holds a raw pointer that is valid for the
// lifetime of the binding; access discipline is the caller's contract.
unsafe impl Send for HostRing {}

// ═══════════════════════════════════════════════════════════════════════════
// DEVICE QUEUES
// ═══════════════════════════════════════════════════════════════════════════

/// Capability token for a transmit descriptor ring.
///
/// Holding one is the permission to write descriptors in the currently
/// owned window and to advance the queue tail. Descriptor status fields
/// remain device-owned until reclaimed.
pub struct TxQueue {
    desc: NonNull<TxDesc>,
    num_desc: usize,
    /// First device index not yet reclaimed. Reconciler-private.
    pub(crate) next_to_clean: usize,
    tail: Doorbell,
}

impl TxQueue {
    /// # Safety
    /// `desc` must point to `num_desc + 1` descriptors that outlive the
    /// queue; the extra entry holds the device's head write-back word.
    pub unsafe fn new(desc: NonNull<TxDesc>, num_desc: usize, tail: Doorbell) -> Self {
        Self {
            desc,
            num_desc,
            next_to_clean: 0,
            tail,
        }
    }

    #[inline]
    pub fn num_desc(&self) -> usize {
        self.num_desc
    }

    #[inline]
    pub(crate) fn desc_mut(&mut self, idx: usize) -> &mut TxDesc {
        debug_assert!(idx < self.num_desc);
        unsafe { &mut *self.desc.as_ptr().add(idx) }
    }

    /// Device head write-back: the first 32 bits of the entry past the
    /// ring, updated out of band as the device consumes descriptors.
    pub fn head_writeback(&self) -> usize {
        let word = unsafe { self.desc.as_ptr().add(self.num_desc) } as *const u32;
        u32::from_le(unsafe { word.read_volatile() }) as usize
    }

    #[inline]
    pub(crate) fn doorbell(&self) -> &Doorbell {
        &self.tail
    }
}

// Safety: raw pointers valid for the queue's lifetime, single-caller
// discipline per ring direction.
unsafe impl Send for TxQueue {}

/// Capability token for a receive descriptor ring.
pub struct RxQueue {
    desc: NonNull<RxDesc>,
    num_desc: usize,
    /// Next device index not yet checked for a completed receive.
    /// Reconciler-private.
    pub(crate) next_to_clean: usize,
    tail: Doorbell,
}

impl RxQueue {
    /// # Safety
    /// `desc` must point to `num_desc` descriptors that outlive the
    /// queue.
    pub unsafe fn new(desc: NonNull<RxDesc>, num_desc: usize, tail: Doorbell) -> Self {
        Self {
            desc,
            num_desc,
            next_to_clean: 0,
            tail,
        }
    }

    #[inline]
    pub fn num_desc(&self) -> usize {
        self.num_desc
    }

    #[inline]
    pub(crate) fn desc(&self, idx: usize) -> &RxDesc {
        debug_assert!(idx < self.num_desc);
        unsafe { &*self.desc.as_ptr().add(idx) }
    }

    #[inline]
    pub(crate) fn desc_mut(&mut self, idx: usize) -> &mut RxDesc {
        debug_assert!(idx < self.num_desc);
        unsafe { &mut *self.desc.as_ptr().add(idx) }
    }

    #[inline]
    pub(crate) fn doorbell(&self) -> &Doorbell {
        &self.tail
    }
}

// Safety: see TxQueue.
unsafe impl Send for RxQueue {}

/// Device-side half of a binding.
pub enum DeviceQueue {
    Tx(TxQueue),
    Rx(RxQueue),
}

impl DeviceQueue {
    pub fn direction(&self) -> Direction {
        match self {
            Self::Tx(_) => Direction::Tx,
            Self::Rx(_) => Direction::Rx,
        }
    }

    pub fn num_desc(&self) -> usize {
        match self {
            Self::Tx(q) => q.num_desc(),
            Self::Rx(q) => q.num_desc(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RING BINDING
// ═══════════════════════════════════════════════════════════════════════════

/// One host ring bound to one device descriptor ring.
///
/// Caches the index skew and owns the cursors the client never touches.
pub struct RingBinding {
    pub(crate) host: HostRing,
    pub(crate) queue: Option<DeviceQueue>,
    map: SlotMap,
    direction: Direction,
    report: ReportPolicy,
    /// Set by the interrupt glue when the device signalled new work.
    pub(crate) pending_interrupt: bool,
    needs_rearm: bool,
}

impl RingBinding {
    /// Bind a host ring to a device queue with the given index skew
    /// (host index of device index 0).
    ///
    /// Both rings must have the same cardinality.
    pub fn new(host: HostRing, queue: DeviceQueue, skew: usize) -> Self {
        debug_assert_eq!(host.num_slots(), queue.num_desc());
        let direction = queue.direction();
        let map = SlotMap::new(skew, host.num_slots());
        let report = ReportPolicy::half_ring(host.num_slots());
        Self {
            host,
            queue: Some(queue),
            map,
            direction,
            report,
            pending_interrupt: false,
            needs_rearm: false,
        }
    }

    /// A binding whose device ring has not been attached yet. Sync calls
    /// report `DeviceUnavailable` until [`attach`](Self::attach).
    pub fn unbound(host: HostRing, direction: Direction, skew: usize) -> Self {
        let map = SlotMap::new(skew, host.num_slots());
        let report = ReportPolicy::half_ring(host.num_slots());
        Self {
            host,
            queue: None,
            map,
            direction,
            report,
            pending_interrupt: false,
            needs_rearm: false,
        }
    }

    /// Attach the device queue after device-side ring initialization.
    pub fn attach(&mut self, queue: DeviceQueue) {
        debug_assert_eq!(queue.direction(), self.direction);
        debug_assert_eq!(queue.num_desc(), self.host.num_slots());
        self.queue = Some(queue);
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn host(&self) -> &HostRing {
        &self.host
    }

    #[inline]
    pub fn host_mut(&mut self) -> &mut HostRing {
        &mut self.host
    }

    #[inline]
    pub(crate) fn map(&self) -> SlotMap {
        self.map
    }

    #[inline]
    pub fn report_policy(&self) -> ReportPolicy {
        self.report
    }

    pub fn set_report_policy(&mut self, report: ReportPolicy) {
        self.report = report;
    }

    /// Note a device interrupt; the next RX sync will scan for
    /// completions even without the force flag.
    pub fn note_interrupt(&mut self) {
        self.pending_interrupt = true;
    }

    /// True after a reinit until the attach layer re-arms the ring.
    #[inline]
    pub fn needs_rearm(&self) -> bool {
        self.needs_rearm
    }

    /// Acknowledge that the ring has been fully re-armed.
    pub fn rearmed(&mut self) {
        self.needs_rearm = false;
    }

    /// Split borrows for the TX reconciler.
    pub(crate) fn parts_tx(&mut self) -> Option<(&mut HostRing, &mut TxQueue)> {
        match &mut self.queue {
            Some(DeviceQueue::Tx(q)) => Some((&mut self.host, q)),
            _ => None,
        }
    }

    /// Split borrows for the RX reconciler.
    pub(crate) fn parts_rx(&mut self) -> Option<(&mut HostRing, &mut RxQueue)> {
        match &mut self.queue {
            Some(DeviceQueue::Rx(q)) => Some((&mut self.host, q)),
            _ => None,
        }
    }

    /// Ring reinitialization hook.
    ///
    /// Resets every cursor to zero and marks the ring as needing a full
    /// re-arm by the attach layer. Called on invariant violations; this
    /// is a destructive recovery from a client bug, not a crash.
    pub fn reinit(&mut self) {
        warn!("ring reinit: cursors reset, full re-arm required");
        self.host.head = 0;
        self.host.hwcur = 0;
        self.host.hwtail = 0;
        match &mut self.queue {
            Some(DeviceQueue::Tx(q)) => q.next_to_clean = 0,
            Some(DeviceQueue::Rx(q)) => q.next_to_clean = 0,
            None => {}
        }
        self.needs_rearm = true;
    }
}
