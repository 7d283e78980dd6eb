//! Scan config.
pub use bt_hci::param::ScanningFilterPolicy;
use bt_hci::param::AddrKind;
use embassy_time::Duration;

use crate::stack::BleStack;
use crate::{BleHostError, Error};

/// Fast discovery scan interval.
pub const FAST_SCAN_INTERVAL: Duration = Duration::from_millis(60);
/// Fast discovery scan window.
pub const FAST_SCAN_WINDOW: Duration = Duration::from_millis(30);

const SCAN_UNIT_US: u64 = 625;
const SCAN_UNITS_MIN: u64 = 0x0004;
const SCAN_UNITS_MAX: u64 = 0xffff;

/// Scanner configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Passive scanning: no scan requests are sent.
    pub passive: bool,
    /// Scan interval.
    pub interval: Duration,
    /// Scan window.
    pub window: Duration,
    /// Which advertising packets the controller reports.
    pub filter_policy: ScanningFilterPolicy,
    /// PHYs to scan on.
    pub phys: PhySet,
    /// Ask the controller to drop duplicate reports.
    pub filter_duplicates: bool,
    /// Scan duration, or zero to scan until cancelled.
    pub duration: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            passive: true,
            interval: FAST_SCAN_INTERVAL,
            window: FAST_SCAN_WINDOW,
            filter_policy: ScanningFilterPolicy::BasicUnfiltered,
            phys: PhySet::M1,
            filter_duplicates: false,
            duration: Duration::from_secs(0),
        }
    }
}

impl ScanConfig {
    /// Check interval and window against the range accepted by the controller.
    pub fn validate(&self) -> Result<(), Error> {
        let interval = self.interval.as_micros() / SCAN_UNIT_US;
        let window = self.window.as_micros() / SCAN_UNIT_US;
        if !(SCAN_UNITS_MIN..=SCAN_UNITS_MAX).contains(&interval) || !(SCAN_UNITS_MIN..=SCAN_UNITS_MAX).contains(&window) {
            return Err(Error::InvalidValue);
        }
        if window > interval {
            return Err(Error::InvalidValue);
        }
        Ok(())
    }
}

/// PHYs to scan on.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[repr(u8)]
pub enum PhySet {
    /// 1Mbps phy
    M1 = 1,
    /// Coded phy (125kbps, S=8)
    Coded = 4,
    /// 1Mbps and Coded phys
    M1Coded = 5,
}

/// Parameters of a single extended scan request.
///
/// Built from the [`ScanConfig`] every time scanning starts.
#[derive(Debug, Clone, Copy)]
pub struct ScanParams {
    /// Address kind used by the scanner.
    pub own_addr_kind: AddrKind,
    /// Scanner configuration.
    pub config: ScanConfig,
}

/// Starts and stops extended scanning.
///
/// The controller keeps no state of its own; whether scanning runs is
/// tracked by the sync session.
pub struct ScanController {
    config: ScanConfig,
}

impl ScanController {
    /// Create a scan controller using the provided config.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// The config used for every scan.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start passive extended scanning.
    pub fn start<S: BleStack>(&self, stack: &S, own_addr_kind: AddrKind) -> Result<(), BleHostError<S::Error>> {
        self.config.validate()?;
        let params = ScanParams {
            own_addr_kind,
            config: self.config,
        };
        match stack.begin_extended_scan(&params) {
            Ok(()) => {
                info!("[scan] extended scan started");
                Ok(())
            }
            Err(e) => {
                warn!("[scan] extended scan failed to start: {:?}", e);
                Err(BleHostError::Controller(e))
            }
        }
    }

    /// Cancel scanning.
    pub fn stop<S: BleStack>(&self, stack: &S) -> Result<(), BleHostError<S::Error>> {
        match stack.cancel_scan() {
            Ok(()) => {
                info!("[scan] extended scan cancelled");
                Ok(())
            }
            Err(e) => {
                warn!("[scan] extended scan cancel failed: {:?}", e);
                Err(BleHostError::Controller(e))
            }
        }
    }
}
