//! Deterministic in-memory simulation bench.
//!
//! Exposes the same variable namespace the real backend publishes
//! (`Targets/<target>/Simulation Models/Models/<model>/{Signals,Parameters}/...`)
//! and generates seeded sine-family waveforms, so the whole bridge can run
//! and be tested without any vendor tooling attached.

use std::cell::Cell;
use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::backend::{CaptureSession, SimulationBackend};
use crate::error::BackendError;
use crate::types::{
    ArmSpec, CaptureData, CaptureState, SignalGroup, SimState, TaskInfo, Value, VariableInfo,
};

const BASE_PERIOD: f64 = 1e-4;
const NUM_SIGNALS: usize = 4;
/// State observations before an armed capture reports Finished.
const POLLS_TO_FINISH: u8 = 3;

pub struct SimulatedBench {
    seed: u64,
    connected: bool,
    sim_state: SimState,
    names: Vec<String>,
    values: HashMap<String, Value>,
    tasks: Vec<TaskInfo>,
}

impl SimulatedBench {
    pub fn new(model: &str, seed: u64) -> Self {
        let base = format!("Targets/Controller/Simulation Models/Models/{model}");
        let mut names = Vec::new();
        let mut values = HashMap::new();

        for i in 0..NUM_SIGNALS {
            let name = format!("{base}/Signals/sig_{i:02}");
            values.insert(name.clone(), Value::Scalar(0.0));
            names.push(name);
        }

        // Parameters are published out of index order on purpose: consumers
        // are expected to reorder by the trailing `_(N)` suffix.
        let params: [(&str, Value); 3] = [
            ("limit_(2)", Value::Scalar(10.0)),
            ("gain_(0)", Value::Scalar(1.0)),
            ("filter_(1)", Value::Vector(vec![0.25, 0.5, 0.25])),
        ];
        for (suffix, value) in params {
            let name = format!("{base}/Parameters/{suffix}");
            values.insert(name.clone(), value);
            names.push(name);
        }

        let checksum = format!("{base}/Parameters/{model}_checksum");
        values.insert(
            checksum.clone(),
            Value::Vector(vec![(seed & 0xffff_ffff) as f64, (seed >> 32) as f64]),
        );
        names.push(checksum);

        Self {
            seed,
            connected: false,
            sim_state: SimState::Disconnected,
            names,
            values,
            tasks: vec![TaskInfo {
                name: "Base Rate".into(),
                period: BASE_PERIOD,
            }],
        }
    }

    fn ensure_connected(&self) -> Result<(), BackendError> {
        if self.connected {
            Ok(())
        } else {
            Err(BackendError::NotConnected)
        }
    }
}

impl SimulationBackend for SimulatedBench {
    fn connect(&mut self) -> Result<(), BackendError> {
        debug!("simulated bench connected");
        self.connected = true;
        self.sim_state = SimState::Stopped;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.sim_state = SimState::Disconnected;
    }

    fn state(&self) -> SimState {
        self.sim_state
    }

    fn start_simulation(&mut self) -> Result<(), BackendError> {
        self.ensure_connected()?;
        self.sim_state = SimState::Running;
        Ok(())
    }

    fn stop_simulation(&mut self) -> Result<(), BackendError> {
        self.ensure_connected()?;
        self.sim_state = SimState::Stopped;
        Ok(())
    }

    fn variable_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn variable_info(&self, name: &str) -> Result<VariableInfo, BackendError> {
        match self.values.get(name) {
            Some(Value::Scalar(_)) => Ok(VariableInfo { x_size: 0, y_size: 0 }),
            Some(Value::Vector(v)) => Ok(VariableInfo {
                x_size: v.len() as u64,
                y_size: 0,
            }),
            None => Err(BackendError::UnknownVariable(name.into())),
        }
    }

    fn read(&self, name: &str) -> Result<Value, BackendError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::UnknownVariable(name.into()))
    }

    fn write(&mut self, name: &str, value: Value) -> Result<(), BackendError> {
        match self.values.get_mut(name) {
            Some(slot) => {
                // A variable's shape is fixed at publication time.
                let compatible = match (&*slot, &value) {
                    (Value::Scalar(_), Value::Scalar(_)) => true,
                    (Value::Vector(a), Value::Vector(b)) => a.len() == b.len(),
                    _ => false,
                };
                if !compatible {
                    return Err(BackendError::UnsupportedShape(name.into()));
                }
                *slot = value;
                Ok(())
            }
            None => Err(BackendError::UnknownVariable(name.into())),
        }
    }

    fn tasks(&self) -> Vec<TaskInfo> {
        self.tasks.clone()
    }

    fn create_capture(&mut self, task: &str) -> Result<Box<dyn CaptureSession>, BackendError> {
        let task = self
            .tasks
            .iter()
            .find(|t| t.name == task)
            .ok_or_else(|| BackendError::UnknownTask(task.into()))?;
        Ok(Box::new(SimulatedCapture {
            seed: self.seed,
            base_period: task.period,
            state: Cell::new(CaptureState::Configured),
            polls_left: Cell::new(POLLS_TO_FINISH),
            spec: None,
        }))
    }
}

/// Capture session backed by the seeded waveform generator.
///
/// Each state observation advances the simulated capture one step, so a
/// polling client sees Activated, then Running, then Finished.
pub struct SimulatedCapture {
    seed: u64,
    base_period: f64,
    state: Cell<CaptureState>,
    polls_left: Cell<u8>,
    spec: Option<ArmSpec>,
}

impl SimulatedCapture {
    fn waveform(&self, channel: usize, samples: usize, dt: f64) -> Vec<f64> {
        let mut rng = SmallRng::seed_from_u64(self.seed.wrapping_add(channel as u64));
        let amplitude: f64 = rng.random_range(0.5..2.0);
        let frequency: f64 = rng.random_range(10.0..500.0);
        let phase: f64 = rng.random_range(0.0..std::f64::consts::TAU);
        (0..samples)
            .map(|k| amplitude * (std::f64::consts::TAU * frequency * k as f64 * dt + phase).sin())
            .collect()
    }
}

impl CaptureSession for SimulatedCapture {
    fn state(&self) -> CaptureState {
        let observed = self.state.get();
        match observed {
            CaptureState::Activated => self.state.set(CaptureState::Running),
            CaptureState::Running => {
                let left = self.polls_left.get();
                if left <= 1 {
                    self.state.set(CaptureState::Finished);
                } else {
                    self.polls_left.set(left - 1);
                }
            }
            _ => {}
        }
        observed
    }

    fn arm(&mut self, spec: &ArmSpec) -> Result<(), BackendError> {
        if spec.variables.is_empty() {
            return Err(BackendError::Capture("no capture variables".into()));
        }
        if spec.downsampling == 0 {
            return Err(BackendError::Capture("zero downsampling period".into()));
        }
        self.spec = Some(spec.clone());
        self.state.set(CaptureState::Activated);
        self.polls_left.set(POLLS_TO_FINISH);
        Ok(())
    }

    fn stop(&mut self) {
        self.state.set(CaptureState::Configured);
    }

    fn fetch(&mut self) -> Result<CaptureData, BackendError> {
        if self.state.get() != CaptureState::Finished {
            return Err(BackendError::Capture("capture not finished".into()));
        }
        let spec = self
            .spec
            .as_ref()
            .ok_or_else(|| BackendError::Capture("capture never armed".into()))?;

        let samples = (spec.stop_after_samples / spec.downsampling).max(1) as usize;
        let dt = self.base_period * spec.downsampling as f64;
        let x = (0..samples).map(|k| k as f64 * dt).collect();
        let y = (0..spec.variables.len())
            .map(|channel| self.waveform(channel, samples, dt))
            .collect();

        self.state.set(CaptureState::Configured);
        Ok(CaptureData {
            groups: vec![SignalGroup { x, y }],
        })
    }
}
