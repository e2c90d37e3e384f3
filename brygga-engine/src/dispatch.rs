//! Inbound message dispatch. Every handler runs on the event loop thread.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use brygga_protocol::message::{self, ErrorReply, ModelInfoReply, Request};
use brygga_sim::Value;

use crate::bridge::Bridge;
use crate::state::ConnectionState;

impl Bridge {
    /// Decodes and routes one raw client message.
    ///
    /// Messages arriving before the backend is connected are dropped;
    /// malformed or unknown ones get an error reply and never take the
    /// bridge down.
    pub(crate) fn on_message(self: &Arc<Self>, raw: String) {
        self.el.assert_loop_thread();
        {
            let state = self.state.lock();
            if state.conn != ConnectionState::Connected {
                debug!("dropping client message, not connected");
                return;
            }
        }

        match Request::decode(&raw) {
            Ok(Request::Disconnect) => self.handle_disconnect(),
            Ok(Request::ModelInfoQuery) => self.handle_model_info(),
            Ok(Request::Scope(request)) => self.submit_capture(request),
            Ok(Request::TuneParams(request)) => self.handle_tune(request),
            Ok(Request::Unknown(code)) => {
                warn!(code, "unsupported command");
                self.send_reply(&ErrorReply::unsupported_command());
            }
            Err(e) => {
                warn!(error = %e, "undecodable client message");
                self.send_reply(&ErrorReply::unsupported_command());
            }
        }
    }

    fn handle_disconnect(&self) {
        {
            let mut state = self.state.lock();
            // Abort any pending scope requests; the session itself is torn
            // down by the supervisor if the loop goes down.
            if let Some(slot) = state.active.take() {
                slot.clear();
            }
        }
        if self.config.server.keep_alive {
            debug!("client disconnected, keeping bridge alive");
        } else {
            debug!("client disconnected, shutting down");
            self.el.cancel();
        }
    }

    fn handle_model_info(&self) {
        let reply = {
            let state = self.state.lock();
            let Some(discovery) = &state.discovery else {
                return;
            };

            let mut checksum = String::new();
            if let Some(name) = &discovery.checksum_parameter {
                match state.backend.read(name) {
                    // The checksum is published as a float vector; each
                    // element holds 32 significant bits, rendered as eight
                    // hex digits.
                    Ok(Value::Vector(words)) => {
                        for word in words {
                            checksum.push_str(&format!("{:08x}", word as u64));
                        }
                    }
                    Ok(Value::Scalar(_)) => {
                        warn!(parameter = %name, "checksum parameter is not a vector");
                    }
                    Err(e) => warn!(error = %e, "failed to read checksum parameter"),
                }
            }

            ModelInfoReply::new(
                discovery.base_sample_time,
                checksum,
                discovery.num_flat_signals as i32,
                discovery.num_flat_parameters as i32,
            )
        };
        self.send_reply(&reply);
    }

    pub(crate) fn send_reply<T: Serialize>(&self, reply: &T) {
        match message::encode(reply) {
            Ok(raw) => {
                if !self.transport.send(&raw) {
                    warn!("reply not delivered");
                }
            }
            Err(e) => error!(error = %e, "failed to encode reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testkit::{connected_harness, disconnected_harness, keep_alive_harness};

    #[test]
    fn messages_are_dropped_while_disconnected() {
        let h = disconnected_harness();
        h.bridge.on_message(r#"{"Command":0}"#.into());
        h.bridge.el.run_until_idle();
        assert!(h.transport.replies().is_empty());
    }

    #[test]
    fn model_info_reports_counts_and_checksum() {
        let h = connected_harness();
        h.bridge.on_message(r#"{"Command":0}"#.into());

        let replies = h.transport.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["Command"], 3);
        assert_eq!(replies[0]["BaseTimeStep"], 1e-4);
        assert_eq!(replies[0]["NumSignals"], 4);
        assert_eq!(replies[0]["NumParameters"], 5);
        // 0xdeadbeef published as one 32-bit checksum word.
        assert_eq!(replies[0]["Checksum"], "deadbeef");
    }

    #[test]
    fn unknown_command_gets_an_error_reply() {
        let h = connected_harness();
        h.bridge.on_message(r#"{"Command":42}"#.into());

        let replies = h.transport.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["Command"], 6);
        assert_eq!(replies[0]["ErrorMessage"], "Unsupported Command.");
        assert!(!h.bridge.el.is_cancelled());
    }

    #[test]
    fn malformed_message_gets_an_error_reply() {
        let h = connected_harness();
        h.bridge.on_message("not json at all".into());
        assert_eq!(h.transport.replies()[0]["Command"], 6);
        assert!(!h.bridge.el.is_cancelled());
    }

    #[test]
    fn missing_command_is_not_a_disconnect() {
        let h = connected_harness();
        h.bridge.on_message(r#"{"Values":[1.0]}"#.into());
        assert_eq!(h.transport.replies()[0]["Command"], 6);
        assert!(!h.bridge.el.is_cancelled());
    }

    #[test]
    fn disconnect_cancels_the_loop_by_default() {
        let h = connected_harness();
        h.bridge.on_message(r#"{"Command":-1}"#.into());
        assert!(h.bridge.el.is_cancelled());
        assert!(h.bridge.state.lock().active.is_none());
    }

    #[test]
    fn disconnect_with_keep_alive_leaves_the_loop_running() {
        let h = keep_alive_harness();
        h.bridge.on_message(r#"{"Command":-1}"#.into());
        assert!(!h.bridge.el.is_cancelled());
    }

    #[test]
    fn disconnect_aborts_a_pending_capture() {
        let h = connected_harness();
        h.bridge
            .on_message(crate::testkit::scope_request(1, &[0], 2, 1));
        let slot = h.bridge.state.lock().active.clone().unwrap();
        assert_eq!(slot.pending(), 1);

        h.bridge.on_message(r#"{"Command":-1}"#.into());
        assert_eq!(slot.pending(), 0);

        // The queued arm action sees the cleared slot and does nothing.
        h.bridge.el.run_until_idle();
        assert!(h.script.lock().arm_calls.is_empty());
        assert!(h.transport.replies().is_empty());
    }
}
