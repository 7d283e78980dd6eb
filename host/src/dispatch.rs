//! Routing of host notifications to the sync session.
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::event::{GapEvent, Status};
use crate::stack::BleStack;
use crate::sync::SyncManager;

/// Event dispatcher.
///
/// Every host notification goes through [`Dispatcher::dispatch`], which never
/// blocks and always reports success back to the host.
pub struct Dispatcher<'d, M: RawMutex, S: BleStack> {
    manager: &'d SyncManager<M, S>,
}

impl<'d, M: RawMutex, S: BleStack> Dispatcher<'d, M, S> {
    /// Create a dispatcher feeding the given manager.
    pub fn new(manager: &'d SyncManager<M, S>) -> Self {
        Self { manager }
    }

    /// Handle a single notification.
    pub fn dispatch(&self, event: &GapEvent) -> Status {
        match event {
            GapEvent::ExtDiscovery(report) => {
                // Scanning must continue for the sync to be established.
                trace!(
                    "[gap] ext discovery addr_type={:?} addr={:?} sid={} rssi={} periodic_interval={}",
                    report.addr_kind,
                    report.addr,
                    report.sid,
                    report.rssi,
                    report.periodic_interval
                );
            }
            GapEvent::DiscoveryComplete { reason } => {
                info!("[gap] discovery complete; reason={}", reason.into_inner());
                self.manager.on_discovery_complete(*reason);
            }
            GapEvent::PeriodicSync(established) => {
                self.manager.on_sync_established(established);
            }
            GapEvent::PeriodicReport(report) => {
                self.manager.on_periodic_report(report);
            }
            GapEvent::PeriodicSyncLost { handle, reason } => {
                self.manager.on_sync_lost(*handle, *reason);
                self.manager.rearm();
            }
            GapEvent::Unknown { kind } => {
                debug!("[gap] event {} not handled", kind);
            }
        }
        Status::SUCCESS
    }
}
