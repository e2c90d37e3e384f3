//! Mutable bridge state, owned by the event loop thread.
//!
//! The mutex exists to satisfy `Send` bounds on posted actions; every lock
//! is taken from the loop thread (or from an inline test driver) and held
//! only for the duration of one action.

use std::sync::Arc;

use brygga_sim::{CaptureSession, SimulationBackend};

use crate::capture::CaptureSlot;
use crate::model::ModelDiscovery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Disconnected,
    Connected,
}

pub(crate) struct BridgeState {
    pub conn: ConnectionState,
    pub backend: Box<dyn SimulationBackend>,
    /// Capture session created at connect time, re-armed for every request.
    pub session: Option<Box<dyn CaptureSession>>,
    pub discovery: Option<ModelDiscovery>,
    /// The capture configuration requests coalesce against.
    pub active: Option<Arc<CaptureSlot>>,
}

impl BridgeState {
    pub fn new(backend: Box<dyn SimulationBackend>) -> Self {
        Self {
            conn: ConnectionState::Disconnected,
            backend,
            session: None,
            discovery: None,
            active: None,
        }
    }
}
