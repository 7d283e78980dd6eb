//! Commands issued against the underlying BLE host stack.
use bt_hci::param::AddrKind;

use crate::config::SyncParams;
use crate::scan::ScanParams;
use crate::target::SyncTarget;

/// Conditional error formatting bound: requires `defmt::Format` under `defmt`,
/// `core::fmt::Debug` otherwise.
#[cfg(not(feature = "defmt"))]
pub trait ErrorFormat: core::fmt::Debug {}
#[cfg(not(feature = "defmt"))]
impl<T: core::fmt::Debug> ErrorFormat for T {}

/// Conditional error formatting bound: requires `defmt::Format` under `defmt`,
/// `core::fmt::Debug` otherwise.
#[cfg(feature = "defmt")]
pub trait ErrorFormat: defmt::Format {}
#[cfg(feature = "defmt")]
impl<T: defmt::Format> ErrorFormat for T {}

/// Interface to a host stack that performs scanning and periodic sync establishment.
///
/// Every method issues a command and returns without waiting for its outcome.
/// Completion is reported later through a [`GapEvent`](crate::event::GapEvent).
/// The session lock is never held while a command runs, so an implementation
/// may deliver events from within these calls.
pub trait BleStack {
    /// Error returned when the host rejects a command.
    type Error: ErrorFormat;

    /// Make sure an identity address is configured, and return its kind.
    fn ensure_identity_address(&self, prefer_random: bool) -> Result<AddrKind, Self::Error>;

    /// Start extended scanning.
    fn begin_extended_scan(&self, params: &ScanParams) -> Result<(), Self::Error>;

    /// Cancel an ongoing scan.
    fn cancel_scan(&self) -> Result<(), Self::Error>;

    /// Request synchronization to the periodic advertising train of `target`.
    ///
    /// Only one request may be outstanding at a time.
    fn create_periodic_sync(&self, target: &SyncTarget, params: &SyncParams) -> Result<(), Self::Error>;

    /// Cancel the outstanding periodic sync create request.
    fn cancel_periodic_sync(&self) -> Result<(), Self::Error>;
}

impl<T: BleStack> BleStack for &T {
    type Error = T::Error;

    fn ensure_identity_address(&self, prefer_random: bool) -> Result<AddrKind, Self::Error> {
        T::ensure_identity_address(self, prefer_random)
    }

    fn begin_extended_scan(&self, params: &ScanParams) -> Result<(), Self::Error> {
        T::begin_extended_scan(self, params)
    }

    fn cancel_scan(&self) -> Result<(), Self::Error> {
        T::cancel_scan(self)
    }

    fn create_periodic_sync(&self, target: &SyncTarget, params: &SyncParams) -> Result<(), Self::Error> {
        T::create_periodic_sync(self, target, params)
    }

    fn cancel_periodic_sync(&self) -> Result<(), Self::Error> {
        T::cancel_periodic_sync(self)
    }
}
