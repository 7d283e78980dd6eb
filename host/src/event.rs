//! Notifications delivered by the host stack.
use bt_hci::param::{AddrKind, BdAddr, PhyKind};
use embassy_time::Duration;
use heapless::Vec;

use crate::sync::SyncHandle;

/// Largest periodic advertising payload carried by a single report.
pub const MAX_PERIODIC_DATA: usize = 247;

/// Status code exchanged with the host stack.
///
/// Zero means success; any other value is a host or controller error code.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(u8);

impl Status {
    /// Success.
    pub const SUCCESS: Status = Status(0x00);

    /// Wrap a raw status code.
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Raw status code.
    pub const fn into_inner(self) -> u8 {
        self.0
    }

    /// Returns true if the status reports success.
    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }
}

/// Why an established sync was lost.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    /// No periodic advertising packet was received within the sync timeout.
    Timeout,
    /// The sync was terminated by the host.
    Terminated,
    /// Any other reason reported by the host.
    Other(u8),
}

impl LossReason {
    const TIMEOUT: u8 = 0x08;
    const TERMINATED: u8 = 0x16;

    /// Map a host reason code.
    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::TIMEOUT => Self::Timeout,
            Self::TERMINATED => Self::Terminated,
            other => Self::Other(other),
        }
    }

    /// Host reason code.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Timeout => Self::TIMEOUT,
            Self::Terminated => Self::TERMINATED,
            Self::Other(other) => other,
        }
    }
}

/// Completeness of the data in a periodic advertising report.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    /// All data received.
    Complete,
    /// More data will follow in a later report.
    Incomplete,
    /// Data truncated, no more to come.
    Truncated,
}

/// Extended advertising report received while scanning.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtDiscoveryReport {
    /// Advertiser address kind.
    pub addr_kind: AddrKind,
    /// Advertiser address.
    pub addr: BdAddr,
    /// Advertising set identifier.
    pub sid: u8,
    /// Received signal strength, in dBm.
    pub rssi: i8,
    /// Periodic advertising interval in 1.25 ms units, zero if the advertiser has none.
    pub periodic_interval: u16,
}

/// Outcome of a periodic sync create request.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicSyncEstablished {
    /// Establishment status, non-zero on failure.
    pub status: Status,
    /// Handle assigned by the host to the sync.
    pub handle: SyncHandle,
    /// Advertising set identifier.
    pub sid: u8,
    /// Advertiser address kind.
    pub addr_kind: AddrKind,
    /// Advertiser address.
    pub addr: BdAddr,
    /// PHY the periodic advertising train is sent on.
    pub phy: PhyKind,
    /// Periodic advertising interval in 1.25 ms units.
    pub interval: u16,
    /// Advertiser clock accuracy code.
    pub clock_accuracy: u8,
}

impl PeriodicSyncEstablished {
    /// Periodic advertising interval as a duration.
    pub fn interval_duration(&self) -> Duration {
        Duration::from_micros(self.interval as u64 * 1250)
    }
}

/// Periodic advertising report received on an established sync.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicReport {
    /// Sync the report was received on.
    pub handle: SyncHandle,
    /// Transmit power, in dBm.
    pub tx_power: i8,
    /// Received signal strength, in dBm.
    pub rssi: i8,
    /// Completeness of the payload.
    pub data_status: DataStatus,
    /// Advertising payload, not interpreted.
    pub data: Vec<u8, MAX_PERIODIC_DATA>,
}

/// Notification from the host stack.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq)]
pub enum GapEvent {
    /// Extended advertising report.
    ExtDiscovery(ExtDiscoveryReport),
    /// Scanning ended on its own, for example because its duration expired.
    DiscoveryComplete {
        /// Reason reported by the host.
        reason: Status,
    },
    /// Outcome of a periodic sync create request.
    PeriodicSync(PeriodicSyncEstablished),
    /// Periodic advertising report.
    PeriodicReport(PeriodicReport),
    /// An established sync was lost.
    PeriodicSyncLost {
        /// Sync that was lost.
        handle: SyncHandle,
        /// Loss reason.
        reason: LossReason,
    },
    /// Any event without a dedicated handler.
    Unknown {
        /// Raw event kind.
        kind: u8,
    },
}
