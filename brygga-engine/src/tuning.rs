//! Positional parameter synchronization.
//!
//! The client sends one flat value vector; a cursor walks the ordered
//! parameter list, consuming one element per scalar and one per vector
//! element. Only parameters whose value actually changed are written back.

use tracing::{debug, warn};

use brygga_protocol::message::TuneParamsRequest;
use brygga_sim::Value;

use crate::bridge::Bridge;
use crate::error::EngineError;
use crate::state::BridgeState;

impl Bridge {
    pub(crate) fn handle_tune(&self, request: TuneParamsRequest) {
        let mut state = self.state.lock();
        match apply(&mut state, &request.values) {
            Ok(writes) => debug!(writes, "parameters synchronized"),
            Err(e) => warn!(error = %e, "parameter tuning failed"),
        }
    }
}

/// Returns the number of parameters written back.
///
/// A value vector shorter than the flattened parameter space stops the
/// cursor; writes up to that point stand.
fn apply(state: &mut BridgeState, values: &[f64]) -> Result<usize, EngineError> {
    let parameters = state
        .discovery
        .as_ref()
        .ok_or(EngineError::NotConnected)?
        .parameters
        .clone();

    let mut cursor = 0;
    let mut writes = 0;
    for name in &parameters {
        let current = state.backend.read(name)?;
        let next = values
            .get(cursor..cursor + current.flat_len())
            .ok_or_else(short_vector)?;
        cursor += current.flat_len();
        if next != current.elements() {
            let value = match current {
                Value::Scalar(_) => Value::Scalar(next[0]),
                Value::Vector(_) => Value::Vector(next.to_vec()),
            };
            state.backend.write(name, value)?;
            writes += 1;
        }
    }
    Ok(writes)
}

fn short_vector() -> EngineError {
    EngineError::Tune("value vector shorter than the flattened parameter space".into())
}

#[cfg(test)]
mod tests {
    use brygga_sim::Value;

    use crate::testkit::connected_harness;

    fn tune(h: &crate::testkit::Harness, values: &[f64]) {
        let request = format!(
            r#"{{"Command":2,"Values":{}}}"#,
            serde_json::to_string(values).unwrap()
        );
        h.bridge.on_message(request);
    }

    #[test]
    fn writes_only_changed_parameters() {
        let h = connected_harness();
        // Defaults: gain 1.0, filter [0.25, 0.5, 0.25], limit 10.0.
        tune(&h, &[2.0, 0.25, 0.5, 0.25, 10.0]);

        let writes = h.writes.lock().clone();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].0.ends_with("gain_(0)"));
        assert_eq!(writes[0].1, Value::Scalar(2.0));
    }

    #[test]
    fn unchanged_values_write_nothing() {
        let h = connected_harness();
        tune(&h, &[1.0, 0.25, 0.5, 0.25, 10.0]);
        assert!(h.writes.lock().is_empty());
    }

    #[test]
    fn single_dirty_vector_element_rewrites_the_vector() {
        let h = connected_harness();
        tune(&h, &[1.0, 0.25, 0.9, 0.25, 10.0]);

        let writes = h.writes.lock().clone();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].0.ends_with("filter_(1)"));
        assert_eq!(writes[0].1, Value::Vector(vec![0.25, 0.9, 0.25]));
    }

    #[test]
    fn positional_order_follows_the_index_suffix_not_the_namespace() {
        let h = connected_harness();
        // Every slot dirty: the first value must land on gain_(0), the last
        // on limit_(2), regardless of the backend's publication order.
        tune(&h, &[3.0, 0.1, 0.2, 0.3, 42.0]);

        let writes = h.writes.lock().clone();
        assert_eq!(writes.len(), 3);
        assert!(writes[0].0.ends_with("gain_(0)"));
        assert!(writes[1].0.ends_with("filter_(1)"));
        assert!(writes[2].0.ends_with("limit_(2)"));
        assert_eq!(writes[2].1, Value::Scalar(42.0));
    }

    #[test]
    fn short_value_vector_keeps_the_written_prefix() {
        let h = connected_harness();
        // Enough values for gain and the filter vector, none for limit.
        tune(&h, &[5.0, 0.25, 0.5, 0.25]);

        let writes = h.writes.lock().clone();
        assert_eq!(writes.len(), 1);
        assert!(writes[0].0.ends_with("gain_(0)"));
        // The bridge stays up; tuning errors are local.
        assert!(!h.bridge.el.is_cancelled());
    }
}
