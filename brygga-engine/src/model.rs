//! Model discovery over the backend's variable namespace.
//!
//! Signals and parameters live under
//! `Targets/<target>/Simulation Models/Models/<model>/{Signals,Parameters}/`.
//! Parameters carry a positional suffix `_(N)` that fixes their order in the
//! flattened tuning vector; the `_checksum` parameter is kept aside and read
//! on demand for model-info replies.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use brygga_sim::SimulationBackend;

use crate::error::EngineError;

static PARAM_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".+_\((?P<index>\d+)\)$").expect("parameter index regex"));

pub(crate) struct ModelDiscovery {
    /// Capturable signal names, in namespace order; scope requests address
    /// them by index into this list.
    pub signals: Vec<String>,
    /// Tunable parameter names, ordered by their `_(N)` suffix.
    pub parameters: Vec<String>,
    pub checksum_parameter: Option<String>,
    /// Name of the task captures are bound to.
    pub task: String,
    /// Base sample period of that task, in seconds.
    pub base_sample_time: f64,
    pub num_flat_signals: usize,
    pub num_flat_parameters: usize,
}

pub(crate) fn discover(
    backend: &dyn SimulationBackend,
    model_pattern: &str,
) -> Result<ModelDiscovery, EngineError> {
    let signal_filter = Regex::new(&format!(
        r"Targets/[\w|\s]*/Simulation Models/Models/{model_pattern}/Signals/[\w|\s]*"
    ))?;
    let parameter_filter = Regex::new(&format!(
        r"Targets/[\w|\s]*/Simulation Models/Models/{model_pattern}/Parameters/[\w|\s]*"
    ))?;

    let names = backend.variable_names();

    let signals: Vec<String> = names
        .iter()
        .filter(|name| signal_filter.is_match(name))
        .cloned()
        .collect();
    for name in &signals {
        let info = backend.variable_info(name)?;
        if info.x_size != 0 || info.y_size != 0 {
            return Err(EngineError::UnsupportedShape(format!(
                "signal {name} is not scalar ({}x{})",
                info.x_size, info.y_size
            )));
        }
    }
    let num_flat_signals = signals.len();

    let mut checksum_parameter = None;
    let mut indexed: Vec<(u64, String)> = Vec::new();
    for name in names.iter().filter(|name| parameter_filter.is_match(name)) {
        if name.ends_with("_checksum") {
            checksum_parameter = Some(name.clone());
            continue;
        }
        let index = PARAM_INDEX
            .captures(name)
            .and_then(|captures| captures["index"].parse::<u64>().ok())
            .ok_or_else(|| {
                EngineError::Discovery(format!("parameter {name} has no positional index"))
            })?;
        indexed.push((index, name.clone()));
    }
    indexed.sort_by_key(|(index, _)| *index);
    let parameters: Vec<String> = indexed.into_iter().map(|(_, name)| name).collect();

    let mut num_flat_parameters = 0;
    for name in &parameters {
        let info = backend.variable_info(name)?;
        if info.y_size != 0 {
            return Err(EngineError::UnsupportedShape(format!(
                "parameter {name} has a Y dimension ({})",
                info.y_size
            )));
        }
        num_flat_parameters += info.x_size.max(1) as usize;
    }

    let task = backend
        .tasks()
        .into_iter()
        .next()
        .ok_or(EngineError::NoTasks)?;
    debug!(
        signals = num_flat_signals,
        parameters = num_flat_parameters,
        task = %task.name,
        period = task.period,
        "model discovered"
    );

    Ok(ModelDiscovery {
        signals,
        parameters,
        checksum_parameter,
        task: task.name,
        base_sample_time: task.period,
        num_flat_signals,
        num_flat_parameters,
    })
}
