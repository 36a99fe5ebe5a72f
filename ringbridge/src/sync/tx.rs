//! Transmit reconciliation.
//!
//! Two phases per call: drain client slots `[hwcur, head)` into the
//! device ring and ring the doorbell, then reclaim descriptors the
//! device has finished with by reading its head write-back word and
//! advancing `hwtail`.

use log::{trace, warn};

use crate::error::{BufferError, Result, SyncError};
use crate::host::{BufferTable, LinkState};
use crate::mmio::wmb;
use crate::ring::RingBinding;
use crate::sync::SyncStatus;
use crate::types::desc::{TXD_CMD_EOP, TXD_CMD_RS};
use crate::types::{Direction, SlotFlags};

pub(super) fn txsync<B: BufferTable, L: LinkState>(
    binding: &mut RingBinding,
    buffers: &B,
    link: &L,
) -> Result<SyncStatus> {
    if !link.carrier_ok() {
        trace!("tx sync: no carrier, deferring");
        return Ok(SyncStatus::LinkDown);
    }

    let map = binding.map();
    let report = binding.report_policy();
    let head = binding.host().head;
    let lim = map.num_slots() - 1;

    let mut reset = false;
    {
        let Some((host, queue)) = binding.parts_tx() else {
            warn!("tx sync with no device queue attached");
            return Err(SyncError::DeviceUnavailable);
        };

        if head > lim {
            warn!("tx head {} out of bounds (lim {})", head, lim);
            reset = true;
        }

        // Phase A: hand client slots [hwcur, head) to the device.
        if !reset && host.hwcur != head {
            let mut nm_i = host.hwcur;
            let mut dev_i = map.to_device(nm_i);
            while nm_i != head {
                let slot = *host.slot(nm_i);
                let paddr = match buffers.resolve(Direction::Tx, &slot) {
                    Ok(paddr) => paddr,
                    Err(BufferError::InvalidBuffer) => {
                        warn!("tx slot {} carries an invalid buffer index", nm_i);
                        reset = true;
                        break;
                    }
                };

                // EOP only on the last fragment; a completion report
                // rides on EOP, either on client request or on the
                // periodic cadence.
                let mut cmd = 0;
                if !slot.flags.contains(SlotFlags::MORE_FRAG) {
                    cmd |= TXD_CMD_EOP;
                    if slot.flags.contains(SlotFlags::REPORT) || report.wants_report(dev_i) {
                        cmd |= TXD_CMD_RS;
                    }
                }

                buffers.sync_for_device(Direction::Tx, paddr, slot.len as usize);
                queue.desc_mut(dev_i).write(paddr + slot.offset, slot.len, cmd);
                host.slot_mut(nm_i).flags.remove(
                    SlotFlags::MORE_FRAG | SlotFlags::REPORT | SlotFlags::BUF_CHANGED,
                );

                nm_i = map.next(nm_i);
                dev_i = map.next(dev_i);
            }

            if !reset {
                host.hwcur = head;
                // Descriptor stores must land before the tail write.
                wmb();
                queue.doorbell().ring(dev_i as u32);
                trace!("tx drained to head {}, device tail {}", head, dev_i);
            }
        }

        // Phase B: reclaim descriptors the device has consumed.
        if !reset {
            let hw_head = queue.head_writeback();
            if hw_head > lim {
                warn!("tx head write-back {} out of bounds (lim {})", hw_head, lim);
                reset = true;
            } else if hw_head != queue.next_to_clean {
                let boundary = map.to_host(hw_head);
                let mut tosync = map.next(host.hwtail);
                while tosync != boundary {
                    let slot = *host.slot(tosync);
                    match buffers.resolve(Direction::Tx, &slot) {
                        Ok(paddr) => {
                            buffers.sync_for_cpu(Direction::Tx, paddr, slot.len as usize)
                        }
                        Err(BufferError::InvalidBuffer) => {
                            warn!("tx reclaim hit an invalid buffer index at {}", tosync);
                            reset = true;
                            break;
                        }
                    }
                    tosync = map.next(tosync);
                }
                if !reset {
                    queue.next_to_clean = hw_head;
                    host.hwtail = map.prev(boundary);
                }
            }
        }
    }

    if reset {
        binding.reinit();
        return Ok(SyncStatus::Reset);
    }
    Ok(SyncStatus::Synced)
}
