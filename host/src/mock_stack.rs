use core::cell::{Cell, RefCell};

use bt_hci::param::AddrKind;
use heapless::Vec;

use crate::config::SyncParams;
use crate::scan::ScanParams;
use crate::stack::BleStack;
use crate::target::SyncTarget;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Call {
    EnsureAddress,
    BeginScan,
    CancelScan,
    CreateSync(SyncTarget, SyncParams),
    CancelSync,
}

/// Host stack that records every command and fails on request.
pub(crate) struct MockStack {
    calls: RefCell<Vec<Call, 32>>,
    addr_kind: Cell<AddrKind>,
    scan_addr_kind: Cell<Option<AddrKind>>,
    address_error: Cell<Option<u8>>,
    scan_error: Cell<Option<u8>>,
    cancel_error: Cell<Option<u8>>,
    sync_error: Cell<Option<u8>>,
    cancel_sync_error: Cell<Option<u8>>,
}

impl MockStack {
    pub(crate) fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            addr_kind: Cell::new(AddrKind::PUBLIC),
            scan_addr_kind: Cell::new(None),
            address_error: Cell::new(None),
            scan_error: Cell::new(None),
            cancel_error: Cell::new(None),
            sync_error: Cell::new(None),
            cancel_sync_error: Cell::new(None),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call, 32> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub(crate) fn scan_addr_kind(&self) -> Option<AddrKind> {
        self.scan_addr_kind.get()
    }

    pub(crate) fn use_random_address(&self) {
        self.addr_kind.set(AddrKind::RANDOM);
    }

    pub(crate) fn fail_address(&self, code: u8) {
        self.address_error.set(Some(code));
    }

    pub(crate) fn fail_scan(&self, code: u8) {
        self.scan_error.set(Some(code));
    }

    pub(crate) fn fail_cancel(&self, code: u8) {
        self.cancel_error.set(Some(code));
    }

    pub(crate) fn fail_sync(&self, code: u8) {
        self.sync_error.set(Some(code));
    }

    pub(crate) fn fail_cancel_sync(&self, code: u8) {
        self.cancel_sync_error.set(Some(code));
    }

    pub(crate) fn accept_scan(&self) {
        self.scan_error.set(None);
    }

    fn record(&self, call: Call, error: &Cell<Option<u8>>) -> Result<(), u8> {
        unwrap!(self.calls.borrow_mut().push(call));
        match error.get() {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }
}

impl BleStack for MockStack {
    type Error = u8;

    fn ensure_identity_address(&self, _prefer_random: bool) -> Result<AddrKind, Self::Error> {
        self.record(Call::EnsureAddress, &self.address_error)?;
        Ok(self.addr_kind.get())
    }

    fn begin_extended_scan(&self, params: &ScanParams) -> Result<(), Self::Error> {
        self.scan_addr_kind.set(Some(params.own_addr_kind));
        self.record(Call::BeginScan, &self.scan_error)
    }

    fn cancel_scan(&self) -> Result<(), Self::Error> {
        self.record(Call::CancelScan, &self.cancel_error)
    }

    fn create_periodic_sync(&self, target: &SyncTarget, params: &SyncParams) -> Result<(), Self::Error> {
        self.record(Call::CreateSync(*target, *params), &self.sync_error)
    }

    fn cancel_periodic_sync(&self) -> Result<(), Self::Error> {
        self.record(Call::CancelSync, &self.cancel_sync_error)
    }
}
