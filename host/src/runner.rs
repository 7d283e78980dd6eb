//! Host lifecycle callbacks and task loops.
//!
//! The host stack calls [`SyncRunner::on_host_reset`], [`SyncRunner::on_host_ready`]
//! and [`SyncRunner::on_gap_event`]. When the host delivers its notifications
//! through a channel instead, [`SyncRunner::run`] drains it while keeping the
//! housekeeping loop alive.
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::DynamicReceiver;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Timer};

use crate::config::SyncConfig;
use crate::dispatch::Dispatcher;
use crate::event::{GapEvent, Status};
use crate::stack::BleStack;
use crate::sync::SyncManager;
use crate::{BleHostError, Error};

/// How long the housekeeping task waits for the host to become ready.
pub const STARTUP_TIMEOUT: Duration = Duration::from_millis(500);
/// Period of the housekeeping loop.
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(2);

/// Entry point for the host stack.
pub struct SyncRunner<M: RawMutex, S: BleStack> {
    manager: SyncManager<M, S>,
    started: Signal<M, ()>,
}

impl<M: RawMutex, S: BleStack> SyncRunner<M, S> {
    /// Create a runner for the given stack and configuration.
    pub fn new(stack: S, config: SyncConfig) -> Self {
        Self {
            manager: SyncManager::new(stack, config),
            started: Signal::new(),
        }
    }

    /// The sync session manager.
    pub fn manager(&self) -> &SyncManager<M, S> {
        &self.manager
    }

    /// A dispatcher feeding this runner's session.
    pub fn dispatcher(&self) -> Dispatcher<'_, M, S> {
        Dispatcher::new(&self.manager)
    }

    /// Called by the host when it resets.
    pub fn on_host_reset(&self, reason: Status) {
        info!("[host] resetting state; reason={}", reason.into_inner());
    }

    /// Called by the host once it is ready to accept commands.
    ///
    /// Selects the identity address, validates the configuration and starts
    /// the sync session. A failure to obtain an address or an invalid
    /// configuration aborts startup. A rejected start is logged and leaves the
    /// session idle.
    pub fn on_host_ready(&self) -> Result<(), BleHostError<S::Error>> {
        let config = self.manager.config();
        let kind = match self.manager.stack().ensure_identity_address(config.prefer_random_address) {
            Ok(kind) => kind,
            Err(e) => {
                error!("[host] unable to set identity address: {:?}", e);
                return Err(Error::NoIdentityAddress.into());
            }
        };
        if let Err(e) = config.validate() {
            error!("[host] invalid sync configuration: {:?}", e);
            return Err(e.into());
        }

        self.manager.reset();
        self.manager.set_own_address(kind);
        info!("[host] ready; own_addr_type={:?}", kind);

        if let Err(e) = self.manager.start() {
            warn!("[host] unable to start periodic sync: {:?}", e);
        }
        self.started.signal(());
        Ok(())
    }

    /// Called by the host for every GAP notification.
    pub fn on_gap_event(&self, event: &GapEvent) -> Status {
        self.dispatcher().dispatch(event)
    }

    /// Wait until the host has reported ready, or the timeout expires.
    ///
    /// Returns true if startup completed in time.
    pub async fn wait_started(&self, timeout: Duration) -> bool {
        with_timeout(timeout, self.started.wait()).await.is_ok()
    }

    /// Dispatch every event received on the channel.
    pub async fn run_events(&self, events: DynamicReceiver<'_, GapEvent>) -> ! {
        let dispatcher = self.dispatcher();
        loop {
            let event = events.receive().await;
            dispatcher.dispatch(&event);
        }
    }

    /// Housekeeping loop.
    ///
    /// Waits once for startup, then wakes up periodically so a watchdog sees
    /// the task is alive.
    pub async fn run_housekeeping(&self) -> ! {
        if !self.wait_started(STARTUP_TIMEOUT).await {
            debug!("[host] startup not signalled within {} ms", STARTUP_TIMEOUT.as_millis());
        }
        info!("[host] entering housekeeping loop");
        loop {
            Timer::after(HOUSEKEEPING_INTERVAL).await;
            trace!("[host] session {:?}", self.manager.state());
        }
    }

    /// Run the event consumer and the housekeeping loop.
    pub async fn run(&self, events: DynamicReceiver<'_, GapEvent>) -> ! {
        match select(self.run_events(events), self.run_housekeeping()).await {
            Either::First(never) => never,
            Either::Second(never) => never,
        }
    }
}
