//! Synchronous facade over the event-driven bridge.
//!
//! Callers interact through blocking methods that post an action and wait
//! for its completion, bounded by the configured sync-call timeout. All
//! actual work happens on the event loop thread.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use brygga_config::BryggaConfig;
use brygga_core::EventLoop;
use brygga_sim::{SimState, SimulationBackend};
use brygga_transport::Transport;

use crate::error::EngineError;
use crate::model;
use crate::state::{BridgeState, ConnectionState};
use crate::supervisor;

pub struct Bridge {
    pub(crate) el: Arc<EventLoop>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: BryggaConfig,
    pub(crate) state: Mutex<BridgeState>,
}

impl Bridge {
    pub fn new(
        config: BryggaConfig,
        backend: Box<dyn SimulationBackend>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            el: Arc::new(EventLoop::new()),
            transport,
            config,
            state: Mutex::new(BridgeState::new(backend)),
        })
    }

    fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.config.backend.sync_call_timeout_secs)
    }

    /// Starts the event loop and connects to the backend.
    ///
    /// Returns whether the backend came up; a failed connect leaves the
    /// loop running so the caller can still cancel and join cleanly.
    pub fn run(self: &Arc<Self>) -> Result<bool, EngineError> {
        supervisor::spawn(self)?;
        self.el.run()?;
        let me = Arc::clone(self);
        let connected = self
            .el
            .post_wait_timeout(move || me.connect_action(), self.sync_timeout())?;
        Ok(connected)
    }

    pub(crate) fn connect_action(&self) -> bool {
        let mut guard = self.state.lock();
        match try_connect(&mut guard, &self.config.model.name) {
            Ok(()) => {
                guard.conn = ConnectionState::Connected;
                info!("backend connected");
                true
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                false
            }
        }
    }

    /// Starts the simulation unless it is already running.
    pub fn start_simulation(self: &Arc<Self>) -> Result<bool, EngineError> {
        let me = Arc::clone(self);
        let running = self.el.post_wait_timeout(
            move || {
                let mut state = me.state.lock();
                if state.backend.state() != SimState::Running {
                    if let Err(e) = state.backend.start_simulation() {
                        warn!(error = %e, "failed to start simulation");
                    }
                }
                state.backend.state() == SimState::Running
            },
            self.sync_timeout(),
        )?;
        Ok(running)
    }

    pub fn stop_simulation(self: &Arc<Self>) -> Result<bool, EngineError> {
        let me = Arc::clone(self);
        let stopped = self.el.post_wait_timeout(
            move || {
                let mut state = me.state.lock();
                if state.backend.state() != SimState::Stopped {
                    if let Err(e) = state.backend.stop_simulation() {
                        warn!(error = %e, "failed to stop simulation");
                    }
                }
                state.backend.state() == SimState::Stopped
            },
            self.sync_timeout(),
        )?;
        Ok(stopped)
    }

    /// Wires the transport's inbound callback to the dispatcher and starts
    /// serving. Returns whether the transport came up.
    pub fn start_server(self: &Arc<Self>) -> bool {
        let bridge = Arc::downgrade(self);
        self.transport.start(Box::new(move |raw| {
            if let Some(bridge) = bridge.upgrade() {
                let me = Arc::clone(&bridge);
                bridge.el.post(move || me.on_message(raw));
            }
        }))
    }

    /// Requests shutdown: stops the transport and sets the cancellation
    /// signal. The supervisor then runs ordered teardown on the loop.
    pub fn cancel(&self) {
        self.transport.stop();
        self.el.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.el.is_cancelled()
    }

    /// Blocks until the event loop has drained and exited.
    pub fn join(&self) {
        self.el.join();
    }
}

fn try_connect(state: &mut BridgeState, model_pattern: &str) -> Result<(), EngineError> {
    state.backend.connect()?;
    let discovery = model::discover(state.backend.as_ref(), model_pattern)?;
    let session = state.backend.create_capture(&discovery.task)?;
    state.session = Some(session);
    state.discovery = Some(discovery);
    Ok(())
}
