//! Mode transitions between the regular datapath and native ring access.
//!
//! Flipping modes rewires who owns the device rings, so it must never
//! race with another flip on the same device. A plain mutex serializes
//! them; the interface is quiesced around the flip when it was running.

use log::info;
use spin::Mutex;

/// Device-level control surface the mode gate drives.
pub trait DeviceControl {
    /// Interface administratively running.
    fn is_running(&self) -> bool;

    /// Stop the datapath and release ring ownership.
    fn down(&mut self);

    /// Restart the datapath, re-arming rings under the current mode.
    fn up(&mut self);

    /// Switch ring ownership between native clients and the regular
    /// datapath. Only called while the interface is quiesced.
    fn set_native(&mut self, enabled: bool);
}

/// Serializes mode flips for one device.
pub struct ModeGate {
    lock: Mutex<()>,
}

impl ModeGate {
    pub const fn new() -> Self {
        Self {
            lock: Mutex::new(()),
        }
    }

    /// Flip native ring access on or off.
    ///
    /// A running interface is brought down before the flip and back up
    /// after it, so the device never serves both owners at once. A
    /// stopped interface is flipped in place and left stopped.
    pub fn set_native_mode<D: DeviceControl>(&self, device: &mut D, enabled: bool) {
        let _guard = self.lock.lock();
        let was_running = device.is_running();
        if was_running {
            device.down();
        }
        device.set_native(enabled);
        info!(
            "native ring mode {}",
            if enabled { "enabled" } else { "disabled" }
        );
        if was_running {
            device.up();
        }
    }
}

impl Default for ModeGate {
    fn default() -> Self {
        Self::new()
    }
}
