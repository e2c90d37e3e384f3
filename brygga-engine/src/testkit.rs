//! Scripted backend, in-memory transport and harness builders shared by the
//! engine tests. Harness tests drive the event loop inline on the test
//! thread (`run_until_idle`), which makes action interleavings fully
//! deterministic.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use brygga_config::BryggaConfig;
use brygga_sim::{
    ArmSpec, BackendError, CaptureData, CaptureSession, CaptureState, SignalGroup, SimState,
    SimulationBackend, TaskInfo, Value, VariableInfo,
};
use brygga_transport::{MessageCallback, Transport};

use crate::bridge::Bridge;

const BASE: &str = "Targets/Rig/Simulation Models/Models/plant";

/// Shared knobs and recordings for one scripted backend.
#[derive(Default)]
pub(crate) struct CaptureScript {
    pub fail_connect: bool,
    pub fail_arm: bool,
    pub arm_calls: Vec<ArmSpec>,
    pub stop_calls: usize,
    /// Capture states observed by successive polls; Finished once empty.
    pub states: VecDeque<CaptureState>,
    pub fetches: VecDeque<Result<CaptureData, BackendError>>,
}

pub(crate) struct MockBackend {
    connected: bool,
    sim_state: SimState,
    names: Vec<String>,
    values: HashMap<String, Value>,
    script: Arc<Mutex<CaptureScript>>,
    writes: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockBackend {
    pub fn new(
        script: Arc<Mutex<CaptureScript>>,
        writes: Arc<Mutex<Vec<(String, Value)>>>,
    ) -> Self {
        let mut backend = Self {
            connected: false,
            sim_state: SimState::Disconnected,
            names: Vec::new(),
            values: HashMap::new(),
            script,
            writes,
        };
        for i in 0..4 {
            backend.add_signal(&format!("sig_{i:02}"), Value::Scalar(0.0));
        }
        // Published out of positional order, like a real namespace.
        backend.add_parameter("limit_(2)", Value::Scalar(10.0));
        backend.add_parameter("gain_(0)", Value::Scalar(1.0));
        backend.add_parameter("filter_(1)", Value::Vector(vec![0.25, 0.5, 0.25]));
        backend.add_parameter("plant_checksum", Value::Vector(vec![0xDEAD_BEEFu32 as f64]));
        backend
    }

    pub fn with_defaults() -> Self {
        Self::new(Arc::default(), Arc::default())
    }

    pub fn add_signal(&mut self, name: &str, value: Value) {
        let name = format!("{BASE}/Signals/{name}");
        self.values.insert(name.clone(), value);
        self.names.push(name);
    }

    pub fn add_parameter(&mut self, name: &str, value: Value) {
        let name = format!("{BASE}/Parameters/{name}");
        self.values.insert(name.clone(), value);
        self.names.push(name);
    }
}

impl SimulationBackend for MockBackend {
    fn connect(&mut self) -> Result<(), BackendError> {
        if self.script.lock().fail_connect {
            return Err(BackendError::NotConnected);
        }
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
        self.sim_state = SimState::Running;
        Ok(())
    }

    fn stop_simulation(&mut self) -> Result<(), BackendError> {
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
        let slot = self
            .values
            .get_mut(name)
            .ok_or_else(|| BackendError::UnknownVariable(name.into()))?;
        *slot = value.clone();
        self.writes.lock().push((name.into(), value));
        Ok(())
    }

    fn tasks(&self) -> Vec<TaskInfo> {
        vec![TaskInfo {
            name: "Base Rate".into(),
            period: 1e-4,
        }]
    }

    fn create_capture(&mut self, task: &str) -> Result<Box<dyn CaptureSession>, BackendError> {
        if task != "Base Rate" {
            return Err(BackendError::UnknownTask(task.into()));
        }
        Ok(Box::new(ScriptedCapture {
            script: Arc::clone(&self.script),
            armed: Cell::new(false),
        }))
    }
}

pub(crate) struct ScriptedCapture {
    script: Arc<Mutex<CaptureScript>>,
    armed: Cell<bool>,
}

impl CaptureSession for ScriptedCapture {
    fn state(&self) -> CaptureState {
        if !self.armed.get() {
            return CaptureState::Configured;
        }
        self.script
            .lock()
            .states
            .pop_front()
            .unwrap_or(CaptureState::Finished)
    }

    fn arm(&mut self, spec: &ArmSpec) -> Result<(), BackendError> {
        let mut script = self.script.lock();
        if script.fail_arm {
            return Err(BackendError::Capture("scripted arm failure".into()));
        }
        script.arm_calls.push(spec.clone());
        self.armed.set(true);
        Ok(())
    }

    fn stop(&mut self) {
        self.script.lock().stop_calls += 1;
        self.armed.set(false);
    }

    fn fetch(&mut self) -> Result<CaptureData, BackendError> {
        self.armed.set(false);
        self.script
            .lock()
            .fetches
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Capture("no scripted fetch result".into())))
    }
}

#[derive(Default)]
pub(crate) struct MemTransport {
    callback: Mutex<Option<MessageCallback>>,
    sent: Mutex<Vec<String>>,
    pub stopped: std::sync::atomic::AtomicUsize,
}

impl MemTransport {
    /// Delivers one message as if it came from the client.
    pub fn inject(&self, raw: &str) {
        let callback = self.callback.lock();
        let callback = callback.as_ref().expect("transport not started");
        callback(raw.into());
    }

    pub fn replies(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("reply is valid json"))
            .collect()
    }

    /// Polls until `count` replies have been sent; for tests that run the
    /// loop on its own thread.
    pub fn wait_for_replies(&self, count: usize) -> Vec<serde_json::Value> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let replies = self.replies();
            if replies.len() >= count {
                return replies;
            }
            assert!(Instant::now() < deadline, "timed out waiting for replies");
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Transport for MemTransport {
    fn start(&self, on_message: MessageCallback) -> bool {
        *self.callback.lock() = Some(on_message);
        true
    }

    fn send(&self, message: &str) -> bool {
        self.sent.lock().push(message.into());
        true
    }

    fn stop(&self) {
        self.stopped
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

pub(crate) struct Harness {
    pub bridge: Arc<Bridge>,
    pub transport: Arc<MemTransport>,
    pub script: Arc<Mutex<CaptureScript>>,
    pub writes: Arc<Mutex<Vec<(String, Value)>>>,
}

fn harness_with(config: BryggaConfig, connect: bool) -> Harness {
    let script = Arc::new(Mutex::new(CaptureScript::default()));
    let writes: Arc<Mutex<Vec<(String, Value)>>> = Arc::default();
    let backend = MockBackend::new(Arc::clone(&script), Arc::clone(&writes));
    let transport = Arc::new(MemTransport::default());
    let bridge = Bridge::new(
        config,
        Box::new(backend),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    // Mirror the supervisor's registration so a directly invoked teardown
    // action stays balanced.
    bridge.el.begin_async_action();
    if connect {
        assert!(bridge.connect_action(), "harness connect failed");
    }
    Harness {
        bridge,
        transport,
        script,
        writes,
    }
}

pub(crate) fn connected_harness() -> Harness {
    harness_with(BryggaConfig::default(), true)
}

pub(crate) fn disconnected_harness() -> Harness {
    harness_with(BryggaConfig::default(), false)
}

pub(crate) fn keep_alive_harness() -> Harness {
    let mut config = BryggaConfig::default();
    config.server.keep_alive = true;
    harness_with(config, true)
}

pub(crate) fn scope_request(
    transaction_id: i32,
    signals: &[i32],
    num_samples: i32,
    decimation: i32,
) -> String {
    format!(
        r#"{{"Command":1,"TransactionId":{transaction_id},"Signals":{},"NumSamples":{num_samples},"DecimationPeriod":{decimation}}}"#,
        serde_json::to_string(signals).expect("signal list")
    )
}

pub(crate) fn make_capture_data(channels: &[&[f64]]) -> CaptureData {
    let samples = channels.first().map_or(0, |c| c.len());
    CaptureData {
        groups: vec![SignalGroup {
            x: (0..samples).map(|k| k as f64 * 1e-4).collect(),
            y: channels.iter().map(|c| c.to_vec()).collect(),
        }],
    }
}
