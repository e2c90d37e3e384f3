//! Value shapes and capture descriptors shared across the backend boundary.

/// A scalar or flat vector of floats, the only shapes the bridge supports.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Value {
    /// Number of flattened elements.
    pub fn flat_len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Vector(v) => v.len(),
        }
    }

    /// Flattened view of the elements.
    pub fn elements(&self) -> &[f64] {
        match self {
            Value::Scalar(v) => std::slice::from_ref(v),
            Value::Vector(v) => v,
        }
    }
}

/// Array dimensions of a backend variable; scalars report (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableInfo {
    pub x_size: u64,
    pub y_size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub name: String,
    /// Base sample period in seconds.
    pub period: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Disconnected,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Configured,
    Activated,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Rising,
    Falling,
}

impl TriggerEdge {
    /// Wire encoding: 0 selects a rising edge, anything else falling.
    pub fn from_wire(code: i32) -> Self {
        if code == 0 {
            TriggerEdge::Rising
        } else {
            TriggerEdge::Falling
        }
    }
}

/// Edge-triggered start condition for a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSpec {
    pub variable: String,
    pub threshold: f64,
    pub edge: TriggerEdge,
    /// Carried through from the protocol; backends may apply a zero delay
    /// (see DESIGN.md on the trigger-delay gap).
    pub delay_samples: i32,
}

/// Everything a backend needs to arm one single-shot capture.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmSpec {
    /// Resolved backend variable names, in requested order.
    pub variables: Vec<String>,
    /// Decimation period relative to the base task rate.
    pub downsampling: u64,
    /// Stop condition, counted in base-rate samples.
    pub stop_after_samples: u64,
    pub trigger: Option<TriggerSpec>,
}

/// One captured signal group: an X vector and channel-major Y vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalGroup {
    pub x: Vec<f64>,
    pub y: Vec<Vec<f64>>,
}

/// Raw fetch result; a well-formed capture has exactly one group.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureData {
    pub groups: Vec<SignalGroup>,
}
