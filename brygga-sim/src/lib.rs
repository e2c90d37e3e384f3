//! ## brygga-sim
//! Boundary to the simulation backend: variable access, task enumeration and
//! waveform capture primitives, expressed as object-safe traits, plus a
//! deterministic in-memory bench used by the CLI and by engine tests.
//!
//! ### Key Components:
//! - `backend`: `SimulationBackend` / `CaptureSession` traits
//! - `types`: value shapes, capture states, arm specifications
//! - `bench`: seeded `SimulatedBench` with a sine-family waveform generator

pub mod backend;
pub mod bench;
pub mod error;
pub mod types;

pub use backend::{CaptureSession, SimulationBackend};
pub use bench::SimulatedBench;
pub use error::BackendError;
pub use types::{
    ArmSpec, CaptureData, CaptureState, SignalGroup, SimState, TaskInfo, TriggerEdge, TriggerSpec,
    Value, VariableInfo,
};
