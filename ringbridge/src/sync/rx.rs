//! Receive reconciliation.
//!
//! Two phases per call: import completed receives from the device ring
//! into client slots and advance `hwtail`, then republish client-released
//! slots `[hwcur, head)` as fresh receive descriptors and ring the
//! doorbell.

use log::{trace, warn};

use crate::error::{BufferError, Result, SyncError};
use crate::host::{BufferTable, LinkState};
use crate::mmio::{rmb, wmb};
use crate::ring::RingBinding;
use crate::sync::{SyncFlags, SyncStatus};
use crate::types::desc::{RXD_LEN_S, RXD_STAT_DD, RXD_STAT_EOP};
use crate::types::{Direction, SlotFlags};

pub(super) fn rxsync<B: BufferTable, L: LinkState>(
    binding: &mut RingBinding,
    buffers: &B,
    link: &L,
    flags: SyncFlags,
) -> Result<SyncStatus> {
    if !link.is_running() {
        trace!("rx sync: interface not running, deferring");
        return Ok(SyncStatus::LinkDown);
    }

    let map = binding.map();
    let head = binding.host().head;
    let lim = map.num_slots() - 1;
    let force = flags.contains(SyncFlags::FORCE_READ) || binding.pending_interrupt;

    let mut reset = false;
    {
        let Some((host, queue)) = binding.parts_rx() else {
            warn!("rx sync with no device queue attached");
            return Err(SyncError::DeviceUnavailable);
        };

        if head > lim {
            warn!("rx head {} out of bounds (lim {})", head, lim);
            reset = true;
        }

        // Phase A: import device completions. Skipped entirely unless an
        // interrupt was noted or the caller forces a read.
        if !reset && force {
            let mut dev_i = queue.next_to_clean;
            let mut nm_i = map.to_host(dev_i);
            // hwtail may only land on a packet boundary; a trailing run
            // of non-EOP fragments stays hidden until its EOP arrives.
            let mut complete = host.hwtail;
            let mut scanned = 0;
            while scanned <= lim {
                let status = queue.desc(dev_i).status();
                if status & RXD_STAT_DD == 0 {
                    break;
                }
                // the write-back read must not pass the buffer reads
                rmb();

                let len = ((status >> RXD_LEN_S) & 0xffff) as u16;
                let eop = status & RXD_STAT_EOP != 0;
                {
                    let slot = host.slot_mut(nm_i);
                    slot.len = len;
                    slot.flags = if eop {
                        SlotFlags::empty()
                    } else {
                        SlotFlags::MORE_FRAG
                    };
                }
                match buffers.resolve(Direction::Rx, host.slot(nm_i)) {
                    Ok(paddr) => buffers.sync_for_cpu(Direction::Rx, paddr, len as usize),
                    Err(BufferError::InvalidBuffer) => {
                        warn!("rx import hit an invalid buffer index at {}", nm_i);
                        reset = true;
                        break;
                    }
                }

                nm_i = map.next(nm_i);
                dev_i = map.next(dev_i);
                scanned += 1;
                if eop {
                    complete = nm_i;
                }
            }
            if !reset && scanned > 0 {
                queue.next_to_clean = dev_i;
                host.hwtail = complete;
                trace!("rx imported {} descriptors, hwtail {}", scanned, complete);
            }
        }

        // Phase B: republish client-released slots [hwcur, head).
        if !reset && host.hwcur != head {
            let mut nm_i = host.hwcur;
            let mut dev_i = map.to_device(nm_i);
            while nm_i != head {
                let slot = *host.slot(nm_i);
                let paddr = match buffers.resolve(Direction::Rx, &slot) {
                    Ok(paddr) => paddr,
                    Err(BufferError::InvalidBuffer) => {
                        warn!("rx slot {} carries an invalid buffer index", nm_i);
                        reset = true;
                        break;
                    }
                };

                buffers.sync_for_device(Direction::Rx, paddr, buffers.buf_capacity());
                queue.desc_mut(dev_i).arm(paddr + slot.offset);
                host.slot_mut(nm_i).flags.remove(SlotFlags::BUF_CHANGED);

                nm_i = map.next(nm_i);
                dev_i = map.next(dev_i);
            }

            if !reset {
                host.hwcur = head;
                // Descriptor stores must land before the tail write. The
                // tail stops one short of the armed region so a full
                // ring never reads as empty.
                wmb();
                queue.doorbell().ring(map.prev(dev_i) as u32);
                trace!("rx republished to head {}, device tail {}", head, map.prev(dev_i));
            }
        }
    }

    if force {
        binding.pending_interrupt = false;
    }
    if reset {
        binding.reinit();
        return Ok(SyncStatus::Reset);
    }
    Ok(SyncStatus::Synced)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::ring::SlotMap;
    use crate::sync::testutil::*;
    use crate::sync::{synchronize, SyncFlags, SyncStatus};
    use crate::types::{Direction, SlotFlags};

    fn sync_rx(h: &mut RxHarness, flags: SyncFlags) -> crate::error::Result<SyncStatus> {
        synchronize(&mut h.binding, Direction::Rx, &Table, &Link::default(), flags)
    }

    #[test]
    fn test_import_completed_packets() {
        let mut h = rx_harness(8, 0);
        h.device_deliver(0, 100, true);
        h.device_deliver(1, 200, true);
        h.binding.note_interrupt();

        let status = sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(status, SyncStatus::Synced);
        assert_eq!(h.binding.host().hwtail(), 2);
        assert_eq!(h.slots[0].len, 100);
        assert_eq!(h.slots[1].len, 200);
        assert!(h.slots[0].flags.is_empty());
        assert!(h.slots[1].flags.is_empty());
    }

    #[test]
    fn test_fragmented_packet_sets_more_frag() {
        let mut h = rx_harness(8, 0);
        h.device_deliver(0, 2048, false);
        h.device_deliver(1, 500, true);

        sync_rx(&mut h, SyncFlags::FORCE_READ).unwrap();
        assert_eq!(h.binding.host().hwtail(), 2);
        assert!(h.slots[0].flags.contains(SlotFlags::MORE_FRAG));
        assert!(h.slots[1].flags.is_empty());
    }

    #[test]
    fn test_partial_packet_stays_hidden_until_eop() {
        let mut h = rx_harness(8, 0);
        h.device_deliver(0, 2048, false);

        sync_rx(&mut h, SyncFlags::FORCE_READ).unwrap();
        // the fragment was imported but not exposed
        assert_eq!(h.binding.host().hwtail(), 0);
        assert!(h.slots[0].flags.contains(SlotFlags::MORE_FRAG));

        h.device_deliver(1, 500, true);
        sync_rx(&mut h, SyncFlags::FORCE_READ).unwrap();
        assert_eq!(h.binding.host().hwtail(), 2);
    }

    #[test]
    fn test_import_requires_interrupt_or_force() {
        let mut h = rx_harness(8, 0);
        h.device_deliver(0, 64, true);

        sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(h.binding.host().hwtail(), 0);

        sync_rx(&mut h, SyncFlags::FORCE_READ).unwrap();
        assert_eq!(h.binding.host().hwtail(), 1);
    }

    #[test]
    fn test_noted_interrupt_is_consumed_by_one_scan() {
        let mut h = rx_harness(8, 0);
        h.binding.note_interrupt();
        sync_rx(&mut h, SyncFlags::empty()).unwrap();

        // interrupt consumed; a later completion needs a new one
        h.device_deliver(0, 64, true);
        sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(h.binding.host().hwtail(), 0);
    }

    #[test]
    fn test_republish_arms_descriptors_with_sentinel_tail() {
        let mut h = rx_harness(8, 0);
        h.binding.host_mut().head = 3;

        let status = sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(status, SyncStatus::Synced);
        assert_eq!(h.binding.host().hwcur(), 3);
        // tail stops one short of the armed region
        assert_eq!(h.tail(), 2);
        for i in 0..3 {
            assert_eq!(u64::from_le(h.descs[i].pkt_addr), BUF_BASE + (i as u64 + 1) * BUF_CAPACITY as u64);
            assert_eq!(h.descs[i].status(), 0);
        }
    }

    #[test]
    fn test_republish_without_new_slots_is_a_noop() {
        let mut h = rx_harness(8, 0);
        h.binding.host_mut().head = 2;
        sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(h.tail(), 1);

        *h.tail_reg = 0xffff_ffff;
        sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(*h.tail_reg, 0xffff_ffff);
    }

    #[test]
    fn test_skewed_import_fills_translated_slots() {
        let mut h = rx_harness(8, 3);
        h.device_deliver(0, 77, true);

        sync_rx(&mut h, SyncFlags::FORCE_READ).unwrap();
        // device 0 lands at host 3
        assert_eq!(h.slots[3].len, 77);
        assert_eq!(h.binding.host().hwtail(), 4);
    }

    #[test]
    fn test_invalid_buffer_on_republish_resets() {
        let mut h = rx_harness(8, 0);
        h.slots[1].buf_idx = INVALID_BUF;
        h.binding.host_mut().head = 3;

        let status = sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(status, SyncStatus::Reset);
        assert_eq!(h.binding.host().hwcur(), 0);
        assert!(h.binding.needs_rearm());
        assert_eq!(h.tail(), 0);
    }

    #[test]
    fn test_head_out_of_bounds_resets() {
        let mut h = rx_harness(8, 0);
        h.binding.host_mut().head = 42;

        let status = sync_rx(&mut h, SyncFlags::empty()).unwrap();
        assert_eq!(status, SyncStatus::Reset);
        assert_eq!(h.binding.host().head, 0);
        assert!(h.binding.needs_rearm());
    }

    #[test]
    fn test_not_running_is_a_silent_noop() {
        let mut h = rx_harness(8, 0);
        h.device_deliver(0, 64, true);
        h.binding.host_mut().head = 2;
        let link = Link {
            carrier: true,
            running: false,
        };

        let status = synchronize(
            &mut h.binding,
            Direction::Rx,
            &Table,
            &link,
            SyncFlags::FORCE_READ,
        )
        .unwrap();
        assert_eq!(status, SyncStatus::LinkDown);
        assert_eq!(h.binding.host().hwtail(), 0);
        assert_eq!(h.tail(), 0);
    }

    proptest! {
        #[test]
        fn prop_republish_lands_hwcur_on_head(
            n_pow in 2u32..8,
            head_seed in 0usize..256,
            skew_seed in 0usize..256,
        ) {
            let n = 1usize << n_pow;
            let head = head_seed % n;
            let skew = skew_seed % n;
            let mut h = rx_harness(n, skew);
            h.binding.host_mut().head = head;

            let status = sync_rx(&mut h, SyncFlags::empty()).unwrap();
            prop_assert_eq!(status, SyncStatus::Synced);
            prop_assert_eq!(h.binding.host().hwcur(), head);
            if head != 0 {
                let map = SlotMap::new(skew, n);
                prop_assert_eq!(h.tail() as usize, map.prev(map.to_device(head)));
                for host_i in 0..head {
                    prop_assert_eq!(h.descs[map.to_device(host_i)].status(), 0);
                }
            }
        }
    }
}
