use std::cell::RefCell;

use embassy_time::Duration;
use trouble_periodic_sync::prelude::*;
use trouble_periodic_sync::scan::ScanParams;

pub const BLEPADV_ADDR: [u8; 6] = [0x03, 0x00, 0x00, 0x1e, 0xbb, 0xba];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    EnsureAddress { prefer_random: bool },
    BeginScan {
        own_addr_kind: AddrKind,
        passive: bool,
        interval: Duration,
        window: Duration,
    },
    CancelScan,
    CreateSync { target: SyncTarget, params: SyncParams },
    CancelSync,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostError(pub i32);

/// A host stack that accepts every command and records it.
#[derive(Default)]
pub struct RecordingStack {
    commands: RefCell<Vec<Command>>,
    reject_sync: RefCell<Option<HostError>>,
    reject_scan: RefCell<Option<HostError>>,
}

#[allow(unused)]
impl RecordingStack {
    pub fn commands(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    pub fn reject_sync(&self, error: HostError) {
        self.reject_sync.replace(Some(error));
    }

    pub fn reject_scan(&self, error: HostError) {
        self.reject_scan.replace(Some(error));
    }

    pub fn sync_requests(&self) -> Vec<(SyncTarget, SyncParams)> {
        self.commands
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Command::CreateSync { target, params } => Some((*target, *params)),
                _ => None,
            })
            .collect()
    }
}

impl BleStack for RecordingStack {
    type Error = HostError;

    fn ensure_identity_address(&self, prefer_random: bool) -> Result<AddrKind, Self::Error> {
        self.commands
            .borrow_mut()
            .push(Command::EnsureAddress { prefer_random });
        Ok(AddrKind::PUBLIC)
    }

    fn begin_extended_scan(&self, params: &ScanParams) -> Result<(), Self::Error> {
        self.commands.borrow_mut().push(Command::BeginScan {
            own_addr_kind: params.own_addr_kind,
            passive: params.config.passive,
            interval: params.config.interval,
            window: params.config.window,
        });
        match *self.reject_scan.borrow() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn cancel_scan(&self) -> Result<(), Self::Error> {
        self.commands.borrow_mut().push(Command::CancelScan);
        Ok(())
    }

    fn create_periodic_sync(&self, target: &SyncTarget, params: &SyncParams) -> Result<(), Self::Error> {
        self.commands.borrow_mut().push(Command::CreateSync {
            target: *target,
            params: *params,
        });
        match *self.reject_sync.borrow() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn cancel_periodic_sync(&self) -> Result<(), Self::Error> {
        self.commands.borrow_mut().push(Command::CancelSync);
        Ok(())
    }
}

pub fn target() -> SyncTarget {
    SyncTarget::new(AddrKind::PUBLIC, BdAddr::new(BLEPADV_ADDR))
}

pub fn established(handle: u16) -> GapEvent {
    GapEvent::PeriodicSync(PeriodicSyncEstablished {
        status: Status::SUCCESS,
        handle: SyncHandle::new(handle),
        sid: 1,
        addr_kind: AddrKind::PUBLIC,
        addr: BdAddr::new(BLEPADV_ADDR),
        phy: PhyKind::Le1M,
        interval: 800,
        clock_accuracy: 0,
    })
}

pub fn report(handle: u16, payload: &[u8]) -> GapEvent {
    GapEvent::PeriodicReport(PeriodicReport {
        handle: SyncHandle::new(handle),
        tx_power: 0,
        rssi: -55,
        data_status: DataStatus::Complete,
        data: heapless::Vec::from_slice(payload).unwrap(),
    })
}

pub fn lost(handle: u16, reason: LossReason) -> GapEvent {
    GapEvent::PeriodicSyncLost {
        handle: SyncHandle::new(handle),
        reason,
    }
}
