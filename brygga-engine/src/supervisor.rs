//! Keep-alive supervision and ordered teardown.
//!
//! One registered async action holds the event loop open for the lifetime
//! of the bridge. A named thread parks on the cancellation signal; once
//! cancelled it posts the teardown action, whose final step releases the
//! registration so the loop can drain and exit.

use std::sync::Arc;
use std::thread;

use tracing::info;

use brygga_core::ExecError;

use crate::bridge::Bridge;
use crate::state::ConnectionState;

pub(crate) fn spawn(bridge: &Arc<Bridge>) -> Result<(), ExecError> {
    let cancel = bridge.el.begin_async_action();
    let bridge = Arc::clone(bridge);
    thread::Builder::new()
        .name("brygga-keepalive".into())
        .spawn(move || {
            cancel.wait();
            info!("keep-alive cancelled, scheduling teardown");
            let me = Arc::clone(&bridge);
            bridge.el.post(move || me.teardown_action());
        })?;
    Ok(())
}

impl Bridge {
    /// Stops the transport, releases backend resources and lets the loop
    /// drain. Runs once, as the last meaningful action on the loop.
    pub(crate) fn teardown_action(&self) {
        self.transport.stop();
        {
            let mut state = self.state.lock();
            if let Some(slot) = state.active.take() {
                slot.clear();
            }
            // Dropping the session releases the backend capture resource.
            state.session = None;
            if state.conn == ConnectionState::Connected {
                state.backend.disconnect();
            }
            state.conn = ConnectionState::Disconnected;
        }
        self.el.end_async_action();
        info!("bridge torn down");
    }
}
