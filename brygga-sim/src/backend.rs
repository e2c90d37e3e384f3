//! Object-safe traits describing what the bridge needs from a backend.
//!
//! The engine owns one boxed backend and drives it exclusively from the
//! event loop thread; implementations do not need interior locking.

use crate::error::BackendError;
use crate::types::{ArmSpec, CaptureData, CaptureState, SimState, TaskInfo, Value, VariableInfo};

/// Connection, variable access and task enumeration primitives.
pub trait SimulationBackend: Send {
    fn connect(&mut self) -> Result<(), BackendError>;

    fn disconnect(&mut self);

    fn state(&self) -> SimState;

    fn start_simulation(&mut self) -> Result<(), BackendError>;

    fn stop_simulation(&mut self) -> Result<(), BackendError>;

    /// Full variable namespace, signals and parameters alike.
    fn variable_names(&self) -> Vec<String>;

    fn variable_info(&self, name: &str) -> Result<VariableInfo, BackendError>;

    fn read(&self, name: &str) -> Result<Value, BackendError>;

    fn write(&mut self, name: &str, value: Value) -> Result<(), BackendError>;

    fn tasks(&self) -> Vec<TaskInfo>;

    /// Creates a capture session bound to the named task.
    fn create_capture(&mut self, task: &str) -> Result<Box<dyn CaptureSession>, BackendError>;
}

/// One waveform capture resource.
///
/// Dropping a session releases it; there is no separate dispose call.
pub trait CaptureSession: Send {
    fn state(&self) -> CaptureState;

    fn arm(&mut self, spec: &ArmSpec) -> Result<(), BackendError>;

    /// Stops a capture that is not merely configured; idempotent.
    fn stop(&mut self);

    fn fetch(&mut self) -> Result<CaptureData, BackendError>;
}
