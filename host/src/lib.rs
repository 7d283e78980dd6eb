//! Periodic advertising synchronization for BLE hosts.
//!
//! This crate keeps a single periodic advertising sync alive against one
//! advertiser. It drives passive extended scanning, issues the sync-create
//! request, and turns the notifications delivered by the underlying host
//! stack into session state transitions.
//!
//! The host stack is treated as a collaborator reached through the
//! [`BleStack`](stack::BleStack) trait. Notifications from it are modelled by
//! [`GapEvent`](event::GapEvent) and fed to the [`SyncRunner`](runner::SyncRunner).
#![no_std]
#![allow(async_fn_in_trait)]
#![warn(missing_docs)]

mod fmt;

pub mod config;
pub mod dispatch;
pub mod event;
pub mod runner;
pub mod scan;
pub mod stack;
pub mod sync;
pub mod target;

#[cfg(test)]
mod mock_stack;

/// A BLE host stack error, or an error raised by this crate.
#[derive(Debug, PartialEq)]
pub enum BleHostError<E> {
    /// Error reported by the host stack when issuing a command.
    Controller(E),
    /// Error raised while validating or sequencing a request.
    BleHost(Error),
}

/// Errors raised by the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A parameter is outside of its permitted range.
    InvalidValue,
    /// The sync timeout, in units of 10 ms, is outside `0x000A..=0x4000`.
    ///
    /// Saturates at `u16::MAX` when the requested timeout does not fit in 16 bits.
    SyncTimeoutOutOfRange(u16),
    /// A sync session is already scanning, pending or established.
    AlreadyActive,
    /// The host stack could not provide an identity address.
    NoIdentityAddress,
}

impl<E> From<Error> for BleHostError<E> {
    fn from(value: Error) -> Self {
        Self::BleHost(value)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidValue => write!(f, "invalid value"),
            Error::SyncTimeoutOutOfRange(units) => write!(f, "sync timeout out of range: 0x{:04x}", units),
            Error::AlreadyActive => write!(f, "sync session already active"),
            Error::NoIdentityAddress => write!(f, "no identity address"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::InvalidValue => {
                defmt::write!(fmt, "InvalidValue")
            }
            Error::SyncTimeoutOutOfRange(units) => {
                defmt::write!(fmt, "SyncTimeoutOutOfRange({=u16:#06x})", units)
            }
            Error::AlreadyActive => {
                defmt::write!(fmt, "AlreadyActive")
            }
            Error::NoIdentityAddress => {
                defmt::write!(fmt, "NoIdentityAddress")
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for BleHostError<E>
where
    E: defmt::Format,
{
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            BleHostError::Controller(value) => {
                defmt::write!(fmt, "Controller({})", value)
            }
            BleHostError::BleHost(value) => {
                defmt::write!(fmt, "BleHost({})", value)
            }
        }
    }
}

/// Re-exports of the types needed to set up and drive a sync session.
pub mod prelude {
    pub use bt_hci::param::{AddrKind, BdAddr, PhyKind};

    pub use crate::config::{RearmPolicy, SyncConfig, SyncParams, SyncTimeout};
    pub use crate::dispatch::Dispatcher;
    pub use crate::event::{DataStatus, GapEvent, LossReason, PeriodicReport, PeriodicSyncEstablished, Status};
    pub use crate::runner::SyncRunner;
    pub use crate::scan::{PhySet, ScanConfig, ScanController};
    pub use crate::stack::BleStack;
    pub use crate::sync::{HostCommand, SyncFailure, SyncHandle, SyncManager, SyncSession, SyncState, SyncStats};
    pub use crate::target::SyncTarget;
    pub use crate::{BleHostError, Error};
}
