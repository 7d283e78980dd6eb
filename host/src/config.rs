//! Startup configuration.
//!
//! A [`SyncConfig`] is supplied once when the sync runner is created. It names
//! the advertiser to follow and the fixed parameters used for every scan and
//! sync attempt. Per-attempt request parameters ([`SyncParams`]) are derived
//! from it, and validated before any command reaches the host stack.
use embassy_time::Duration;

use crate::scan::ScanConfig;
use crate::target::SyncTarget;
use crate::Error;

/// Maximum number of periodic advertising events that can be skipped.
pub const MAX_SKIP: u16 = 0x01f3;

/// Sync timeout, counted in units of 10 ms.
///
/// The valid range is `0x000A..=0x4000` (100 ms to 163.84 s).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimeout(u16);

impl SyncTimeout {
    /// Shortest accepted timeout.
    pub const MIN: SyncTimeout = SyncTimeout(0x000a);
    /// Longest accepted timeout.
    pub const MAX: SyncTimeout = SyncTimeout(0x4000);

    const UNIT_MS: u64 = 10;
    const UNIT_US: u64 = Self::UNIT_MS * 1000;

    /// Create a timeout from a raw count of 10 ms units.
    pub fn from_units(units: u16) -> Result<Self, Error> {
        if units < Self::MIN.0 || units > Self::MAX.0 {
            return Err(Error::SyncTimeoutOutOfRange(units));
        }
        Ok(Self(units))
    }

    /// Create a timeout from a duration, rounded up to the next 10 ms unit.
    ///
    /// A duration whose unit count does not fit in a `u16` is reported as
    /// `SyncTimeoutOutOfRange(u16::MAX)`.
    pub fn from_duration(duration: Duration) -> Result<Self, Error> {
        let units = duration.as_micros().div_ceil(Self::UNIT_US);
        let units = u16::try_from(units).map_err(|_| Error::SyncTimeoutOutOfRange(u16::MAX))?;
        Self::from_units(units)
    }

    /// Raw count of 10 ms units.
    pub fn units(&self) -> u16 {
        self.0
    }

    /// Timeout as a duration.
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0 as u64 * Self::UNIT_MS)
    }
}

impl From<SyncTimeout> for Duration {
    fn from(value: SyncTimeout) -> Self {
        value.as_duration()
    }
}

/// Parameters for a single periodic sync create request.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncParams {
    /// Number of periodic advertising events that may be skipped after a successful receive.
    pub skip: u16,
    /// Time without receiving a periodic advertising packet before the sync is lost.
    pub timeout: SyncTimeout,
    /// Disable delivery of periodic advertising reports once synced.
    pub reports_disabled: bool,
}

impl SyncParams {
    /// Create request parameters, checking the skip count against the protocol limit.
    pub fn new(skip: u16, timeout: SyncTimeout, reports_disabled: bool) -> Result<Self, Error> {
        if skip > MAX_SKIP {
            return Err(Error::InvalidValue);
        }
        Ok(Self {
            skip,
            timeout,
            reports_disabled,
        })
    }
}

/// What to do after an established sync has been lost.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RearmPolicy {
    /// Stay in the lost state until `start` is called again.
    Never,
    /// Restart scanning and sync creation once.
    #[default]
    Once,
    /// Restart up to the given number of times in a row.
    Limited(u8),
}

impl RearmPolicy {
    pub(crate) fn budget(&self) -> u8 {
        match self {
            RearmPolicy::Never => 0,
            RearmPolicy::Once => 1,
            RearmPolicy::Limited(n) => *n,
        }
    }
}

/// Configuration of the sync session, supplied at startup.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Advertiser to synchronize with.
    pub target: SyncTarget,
    /// Number of periodic advertising events that may be skipped.
    pub skip: u16,
    /// Sync supervision timeout.
    pub sync_timeout: Duration,
    /// Disable periodic advertising reports once synced.
    pub reports_disabled: bool,
    /// Extended scan parameters used while looking for the advertiser.
    pub scan: ScanConfig,
    /// Recovery policy after a sync is lost.
    pub rearm: RearmPolicy,
    /// Prefer a random identity address over the public one.
    pub prefer_random_address: bool,
}

impl SyncConfig {
    /// Configuration for the given target using default scan and sync parameters.
    ///
    /// No events are skipped, the sync timeout is the protocol maximum and
    /// reports are enabled.
    pub fn new(target: SyncTarget) -> Self {
        Self {
            target,
            skip: 0,
            sync_timeout: SyncTimeout::MAX.as_duration(),
            reports_disabled: false,
            scan: ScanConfig::default(),
            rearm: RearmPolicy::default(),
            prefer_random_address: false,
        }
    }

    /// Build the request parameters for a sync attempt.
    pub fn sync_params(&self) -> Result<SyncParams, Error> {
        let timeout = SyncTimeout::from_duration(self.sync_timeout)?;
        SyncParams::new(self.skip, timeout, self.reports_disabled)
    }

    /// Check that every part of the configuration is acceptable to the host.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.target.is_valid() {
            return Err(Error::InvalidValue);
        }
        self.scan.validate()?;
        self.sync_params()?;
        Ok(())
    }
}
