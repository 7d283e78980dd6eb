//! Periodic advertising sync session.
//!
//! The [`SyncManager`] owns the only [`SyncSession`] of the process and is the
//! single place where its state changes. The session moves through
//!
//! ```text
//! Idle -> Scanning -> SyncPending -> Synced -> Lost
//!   ^                      |                    |
//!   +------- failed -------+---- rearm/start ---+
//! ```
//!
//! Notifications that arrive in a state where they have no meaning are logged
//! and dropped.
use core::cell::RefCell;

use bt_hci::param::AddrKind;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::SyncConfig;
use crate::event::{DataStatus, LossReason, PeriodicReport, PeriodicSyncEstablished, Status};
use crate::scan::ScanController;
use crate::stack::BleStack;
use crate::target::SyncTarget;
use crate::{BleHostError, Error};

/// Handle assigned by the host to an established sync.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncHandle(u16);

impl SyncHandle {
    /// Wrap a raw handle.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    pub const fn raw(&self) -> u16 {
        self.0
    }
}

/// State of the sync session.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing running.
    Idle,
    /// Extended scanning started, sync request not yet issued.
    Scanning,
    /// Sync request issued, waiting for the host to report the outcome.
    SyncPending,
    /// Synchronized to the periodic advertising train.
    Synced,
    /// The established sync was lost.
    Lost,
}

impl SyncState {
    /// Returns true while scanning, pending or synced.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Scanning | SyncState::SyncPending | SyncState::Synced)
    }
}

/// Command issued against the host stack.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Start extended scanning.
    BeginScan,
    /// Cancel scanning.
    CancelScan,
    /// Periodic sync create request.
    CreateSync,
    /// Cancel an outstanding periodic sync create request.
    CancelSync,
}

/// Reason recorded for the last failed sync attempt or lost sync.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailure {
    /// The host reported that the sync could not be established.
    Establish(Status),
    /// The established sync was lost.
    Lost(LossReason),
    /// The host rejected a command needed to start or keep the sync.
    Command(HostCommand),
}

/// Counters kept for the lifetime of the session.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStats {
    /// Periodic advertising reports received while synced.
    pub reports_received: u32,
    /// Reports whose data was truncated by the controller.
    pub truncated_reports: u32,
    /// Sync create requests issued.
    pub attempts: u32,
    /// Established syncs that were lost.
    pub losses: u32,
    /// Host commands rejected by the stack, including scan cancellation.
    pub command_failures: u32,
}

/// Snapshot of the sync session.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSession {
    /// Current state.
    pub state: SyncState,
    /// Handle of the established sync, only set while synced.
    pub sync_handle: Option<SyncHandle>,
    /// Advertiser the session follows.
    pub target: SyncTarget,
    /// Last failure or loss.
    pub last_error: Option<SyncFailure>,
    /// Session counters.
    pub stats: SyncStats,
}

impl SyncSession {
    fn new(target: SyncTarget) -> Self {
        Self {
            state: SyncState::Idle,
            sync_handle: None,
            target,
            last_error: None,
            stats: SyncStats::default(),
        }
    }

    fn command_failed(&mut self, command: HostCommand) {
        self.stats.command_failures = self.stats.command_failures.wrapping_add(1);
        self.last_error = Some(SyncFailure::Command(command));
    }

    fn set_state(&mut self, state: SyncState) {
        trace!("[sync] state {:?} -> {:?}", self.state, state);
        if state != SyncState::Synced {
            self.sync_handle = None;
        }
        self.state = state;
    }
}

struct State {
    session: SyncSession,
    own_addr_kind: AddrKind,
    rearm_budget: u8,
}

/// Owner of the sync session.
///
/// All transitions are serialized through a blocking mutex. Use
/// `NoopRawMutex` when every call happens on the event consumer task, and a
/// critical section mutex when events are delivered from several contexts.
pub struct SyncManager<M: RawMutex, S: BleStack> {
    stack: S,
    config: SyncConfig,
    scan: ScanController,
    state: Mutex<M, RefCell<State>>,
}

impl<M: RawMutex, S: BleStack> SyncManager<M, S> {
    /// Create a manager with an idle session for the configured target.
    pub fn new(stack: S, config: SyncConfig) -> Self {
        Self {
            stack,
            scan: ScanController::new(config.scan),
            state: Mutex::new(RefCell::new(State {
                session: SyncSession::new(config.target),
                own_addr_kind: AddrKind::PUBLIC,
                rearm_budget: config.rearm.budget(),
            })),
            config,
        }
    }

    /// The host stack commands are issued against.
    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// The configuration supplied at startup.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Snapshot of the session.
    pub fn session(&self) -> SyncSession {
        self.with_state(|state| state.session)
    }

    /// Current session state.
    pub fn state(&self) -> SyncState {
        self.with_state(|state| state.session.state)
    }

    /// Record the kind of identity address used for scanning.
    pub fn set_own_address(&self, kind: AddrKind) {
        self.with_state(|state| state.own_addr_kind = kind);
    }

    /// Put the session back to idle, dropping handle, error and counters.
    ///
    /// Nothing is sent to the host; any scan or sync it still runs is left alone.
    pub fn reset(&self) {
        self.with_state(|state| {
            state.session = SyncSession::new(self.config.target);
            state.rearm_budget = self.config.rearm.budget();
        });
    }

    /// Start scanning and request a sync with the configured target.
    ///
    /// Accepted from [`SyncState::Idle`] and [`SyncState::Lost`]. While a
    /// session is active this returns [`Error::AlreadyActive`] and leaves the
    /// state untouched, since only one sync request may be outstanding.
    ///
    /// The session is claimed before any host command is issued, and no lock
    /// is held while the stack runs a command. A command rejected by the host
    /// restores the previous state and is recorded as
    /// [`SyncFailure::Command`].
    pub fn start(&self) -> Result<(), BleHostError<S::Error>> {
        let (previous, own_addr_kind, params) = self.with_state(|state| -> Result<_, BleHostError<S::Error>> {
            let previous = state.session.state;
            if previous.is_active() {
                debug!("[sync] start ignored, session is {:?}", previous);
                return Err(BleHostError::BleHost(Error::AlreadyActive));
            }

            self.config.validate()?;
            let params = self.config.sync_params()?;
            state.session.set_state(SyncState::Scanning);
            Ok((previous, state.own_addr_kind, params))
        })?;

        if let Err(e) = self.scan.start(&self.stack, own_addr_kind) {
            self.abort_start(previous, HostCommand::BeginScan);
            return Err(e);
        }

        self.with_state(|state| state.session.set_state(SyncState::SyncPending));
        if let Err(e) = self.stack.create_periodic_sync(&self.config.target, &params) {
            warn!("[sync] periodic sync create failed: {:?}", e);
            self.stop_scan();
            self.abort_start(previous, HostCommand::CreateSync);
            return Err(BleHostError::Controller(e));
        }

        self.with_state(|state| {
            state.session.stats.attempts = state.session.stats.attempts.wrapping_add(1);
        });
        info!(
            "[sync] periodic sync create issued: addr_type={:?} addr={:?} skip={} timeout={}",
            self.config.target.kind,
            self.config.target.addr,
            params.skip,
            params.timeout.units()
        );
        Ok(())
    }

    /// Handle the outcome of the outstanding sync request.
    ///
    /// A non-success status is handled as [`SyncManager::on_sync_failed`].
    /// Scanning is stopped once the sync is established.
    pub fn on_sync_established(&self, event: &PeriodicSyncEstablished) {
        if !event.status.is_success() {
            self.on_sync_failed(event.status);
            return;
        }

        let established = self.with_state(|state| {
            if state.session.state != SyncState::SyncPending {
                warn!(
                    "[sync] sync established in state {:?}, dropping handle {}",
                    state.session.state,
                    event.handle.raw()
                );
                return false;
            }
            if !state.session.target.matches(event.addr_kind, &event.addr, event.sid) {
                warn!(
                    "[sync] sync established for unexpected advertiser addr_type={:?} addr={:?} sid={}",
                    event.addr_kind,
                    event.addr,
                    event.sid
                );
                return false;
            }

            state.session.set_state(SyncState::Synced);
            state.session.sync_handle = Some(event.handle);
            state.session.last_error = None;
            state.rearm_budget = self.config.rearm.budget();
            info!(
                "[sync] periodic sync established; sync_handle={} sid={} phy={:?} adv_interval={} ca={} addr_type={:?} addr={:?}",
                event.handle.raw(),
                event.sid,
                event.phy,
                event.interval,
                event.clock_accuracy,
                event.addr_kind,
                event.addr
            );
            true
        });

        if established {
            self.stop_scan();
        }
    }

    /// Handle a failed sync establishment.
    pub fn on_sync_failed(&self, status: Status) {
        let failed = self.with_state(|state| {
            if state.session.state != SyncState::SyncPending {
                warn!(
                    "[sync] sync failure in state {:?}, dropping status {}",
                    state.session.state,
                    status.into_inner()
                );
                return false;
            }
            state.session.set_state(SyncState::Idle);
            state.session.last_error = Some(SyncFailure::Establish(status));
            warn!("[sync] periodic sync establishment failed; status={}", status.into_inner());
            true
        });

        if failed {
            self.stop_scan();
        }
    }

    /// Handle the end of scanning reported by the host.
    ///
    /// A sync request cannot complete without scanning, so while one is
    /// outstanding the scan is restarted. If the host refuses, the request is
    /// cancelled and the session returns to [`SyncState::Idle`] with the
    /// failure recorded.
    pub fn on_discovery_complete(&self, reason: Status) {
        let own_addr_kind = self.with_state(|state| {
            if state.session.state != SyncState::SyncPending {
                debug!(
                    "[sync] scan ended in state {:?}; reason={}",
                    state.session.state,
                    reason.into_inner()
                );
                return None;
            }
            Some(state.own_addr_kind)
        });
        let Some(own_addr_kind) = own_addr_kind else {
            return;
        };

        info!(
            "[sync] scan ended with sync pending; reason={}, restarting",
            reason.into_inner()
        );
        if self.scan.start(&self.stack, own_addr_kind).is_err() {
            if let Err(e) = self.stack.cancel_periodic_sync() {
                warn!("[sync] periodic sync create cancel failed: {:?}", e);
                self.with_state(|state| state.session.command_failed(HostCommand::CancelSync));
            }
            self.abort_start(SyncState::Idle, HostCommand::BeginScan);
        }
    }

    /// Count a periodic advertising report received on the established sync.
    pub fn on_periodic_report(&self, report: &PeriodicReport) {
        self.with_state(|state| {
            let session = &mut state.session;
            if session.state != SyncState::Synced || session.sync_handle != Some(report.handle) {
                warn!(
                    "[sync] periodic report for handle {} in state {:?}, dropping",
                    report.handle.raw(),
                    session.state
                );
                return;
            }
            session.stats.reports_received = session.stats.reports_received.wrapping_add(1);
            if report.data_status == DataStatus::Truncated {
                session.stats.truncated_reports = session.stats.truncated_reports.wrapping_add(1);
            }
            trace!(
                "[sync] periodic report; handle={} rssi={} tx_power={} len={} status={:?}",
                report.handle.raw(),
                report.rssi,
                report.tx_power,
                report.data.len(),
                report.data_status
            );
        })
    }

    /// Handle loss of the established sync.
    pub fn on_sync_lost(&self, handle: SyncHandle, reason: LossReason) {
        self.with_state(|state| {
            let session = &mut state.session;
            if session.state != SyncState::Synced || session.sync_handle != Some(handle) {
                warn!(
                    "[sync] sync lost for handle {} in state {:?}, dropping",
                    handle.raw(),
                    session.state
                );
                return;
            }
            session.set_state(SyncState::Lost);
            session.last_error = Some(SyncFailure::Lost(reason));
            session.stats.losses = session.stats.losses.wrapping_add(1);
            info!("[sync] periodic sync lost; handle={} reason={:?}", handle.raw(), reason);
        })
    }

    /// Apply the re-arm policy to a lost session.
    ///
    /// Returns true if scanning and sync creation were restarted.
    pub fn rearm(&self) -> bool {
        let allowed = self.with_state(|state| {
            if state.session.state != SyncState::Lost {
                return false;
            }
            if state.rearm_budget == 0 {
                info!("[sync] re-arm budget exhausted, waiting for start");
                return false;
            }
            state.rearm_budget -= 1;
            true
        });

        if !allowed {
            return false;
        }
        match self.start() {
            Ok(()) => {
                info!("[sync] re-armed after loss");
                true
            }
            Err(e) => {
                warn!("[sync] re-arm failed: {:?}", e);
                false
            }
        }
    }

    fn stop_scan(&self) {
        if self.scan.stop(&self.stack).is_err() {
            self.with_state(|state| {
                let stats = &mut state.session.stats;
                stats.command_failures = stats.command_failures.wrapping_add(1);
            });
        }
    }

    fn abort_start(&self, previous: SyncState, command: HostCommand) {
        self.with_state(|state| {
            let session = &mut state.session;
            if matches!(session.state, SyncState::Scanning | SyncState::SyncPending) {
                session.set_state(previous);
            }
            session.command_failed(command);
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            f(&mut state)
        })
    }
}
