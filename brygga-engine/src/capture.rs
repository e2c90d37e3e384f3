//! Capture coordination: arming, polling and request coalescing.
//!
//! One capture configuration is active at a time. A request with identical
//! settings while one is in flight bumps the pending count to at most two,
//! so at most one retrigger queues up behind the running capture; a request
//! with different settings cancels the old configuration and replaces it.
//! Arm and poll are ordinary actions that re-post themselves, which keeps
//! the loop responsive to disconnects and new requests between polls.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use brygga_protocol::message::{self, ScopeReply, ScopeRequest};
use brygga_sim::{ArmSpec, CaptureData, CaptureState, TriggerEdge, TriggerSpec};
use brygga_transport::Transport;

use crate::bridge::Bridge;
use crate::error::EngineError;
use crate::state::{BridgeState, ConnectionState};

/// Sanitized scope-request settings; equality drives coalescing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CaptureSettings {
    /// Indexes into the discovered signal list.
    pub signals: Vec<i32>,
    pub num_samples: usize,
    pub decimation: u64,
    /// Trigger signal index; negative means free-running.
    pub trigger_signal: i32,
    pub trigger_threshold: f64,
    pub trigger_edge: i32,
    pub trigger_delay: i32,
}

impl CaptureSettings {
    pub fn from_request(request: &ScopeRequest) -> Self {
        Self {
            signals: request.signals.clone(),
            num_samples: request.num_samples.max(0) as usize,
            decimation: request.decimation_period.max(1) as u64,
            trigger_signal: request.trigger_channel,
            trigger_threshold: request.trigger_value,
            trigger_edge: request.trigger_edge,
            trigger_delay: request.trigger_delay,
        }
    }
}

pub(crate) enum CaptureOutcome {
    Done { samples: Vec<f64> },
    Error,
}

pub(crate) type CaptureCallback = Box<dyn Fn(CaptureOutcome) + Send + Sync>;

/// One capture configuration plus its pending-request count.
///
/// `pending` stays in {0, 1, 2}: 0 cancelled or drained, 1 in flight,
/// 2 in flight with one retrigger queued.
pub(crate) struct CaptureSlot {
    pending: AtomicU32,
    pub settings: CaptureSettings,
    pub callback: CaptureCallback,
}

impl CaptureSlot {
    pub fn new(settings: CaptureSettings, callback: CaptureCallback) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicU32::new(1),
            settings,
            callback,
        })
    }

    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Queues one retrigger behind the capture in flight; never more.
    pub fn enqueue_retrigger(&self) {
        self.pending.store(2, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.pending.store(0, Ordering::SeqCst);
    }

    /// Drains one pending request, returning how many remain.
    pub fn finish_one(&self) -> u32 {
        let previous = self.pending.fetch_sub(1, Ordering::SeqCst);
        previous.saturating_sub(1)
    }
}

impl Bridge {
    /// Installs or coalesces a scope request. Loop thread only.
    pub(crate) fn submit_capture(self: &Arc<Self>, request: ScopeRequest) {
        let settings = CaptureSettings::from_request(&request);

        let mut state = self.state.lock();
        let Some(discovery) = &state.discovery else {
            warn!("scope request before model discovery");
            return;
        };
        let sample_time = discovery.base_sample_time * settings.decimation as f64;

        let transport = Arc::clone(&self.transport);
        let transaction_id = request.transaction_id;
        let signals = settings.signals.clone();
        let callback: CaptureCallback = Box::new(move |outcome| {
            let reply = match outcome {
                CaptureOutcome::Done { samples } => {
                    ScopeReply::new(transaction_id, 0, sample_time, signals.clone(), samples)
                }
                CaptureOutcome::Error => {
                    ScopeReply::new(transaction_id, 1, sample_time, signals.clone(), Vec::new())
                }
            };
            send_scope_reply(transport.as_ref(), &reply);
        });

        if let Some(active) = &state.active {
            if active.settings == settings && active.pending() > 0 {
                debug!(transaction_id, "coalesced into pending capture");
                active.enqueue_retrigger();
                return;
            }
            // Different settings, or a drained slot: the old configuration
            // must not retrigger once this one is armed.
            active.clear();
        }

        let slot = CaptureSlot::new(settings, callback);
        state.active = Some(Arc::clone(&slot));
        drop(state);

        let me = Arc::clone(self);
        self.el.post(move || me.arm_capture(slot));
    }

    pub(crate) fn arm_capture(self: &Arc<Self>, slot: Arc<CaptureSlot>) {
        self.el.assert_loop_thread();
        let mut guard = self.state.lock();
        if guard.conn != ConnectionState::Connected {
            return;
        }
        if slot.settings.signals.is_empty() {
            return;
        }
        if slot.pending() == 0 {
            debug!("arming cancelled");
            return;
        }

        match try_arm(&mut guard, &slot) {
            Ok(()) => {
                drop(guard);
                let me = Arc::clone(self);
                let slot = Arc::clone(&slot);
                self.el.post(move || me.poll_capture(slot));
            }
            Err(e) => {
                slot.clear();
                drop(guard);
                error!(error = %e, "failed to arm capture, shutting down");
                self.el.cancel();
            }
        }
    }

    pub(crate) fn poll_capture(self: &Arc<Self>, slot: Arc<CaptureSlot>) {
        self.el.assert_loop_thread();
        let mut guard = self.state.lock();
        if guard.conn != ConnectionState::Connected {
            return;
        }
        if slot.pending() == 0 {
            return;
        }
        let state: &mut BridgeState = &mut guard;
        let Some(session) = state.session.as_mut() else {
            return;
        };

        match session.state() {
            CaptureState::Activated | CaptureState::Running => {
                drop(guard);
                let me = Arc::clone(self);
                let slot = Arc::clone(&slot);
                self.el.post(move || me.poll_capture(slot));
            }
            CaptureState::Configured => {
                // The capture fell back without finishing; report and drop
                // the request, but keep the bridge up.
                slot.clear();
                drop(guard);
                warn!("capture deconfigured while polling");
                (slot.callback)(CaptureOutcome::Error);
            }
            CaptureState::Finished => {
                let result = session
                    .fetch()
                    .map_err(|e| e.to_string())
                    .and_then(|data| collect_samples(data, &slot.settings));
                match result {
                    Ok(samples) => {
                        let remaining = slot.finish_one();
                        drop(guard);
                        (slot.callback)(CaptureOutcome::Done { samples });
                        if remaining > 0 {
                            let me = Arc::clone(self);
                            let slot = Arc::clone(&slot);
                            self.el.post(move || me.arm_capture(slot));
                        }
                    }
                    Err(reason) => {
                        slot.clear();
                        drop(guard);
                        error!(%reason, "capture fetch failed, shutting down");
                        (slot.callback)(CaptureOutcome::Error);
                        self.el.cancel();
                    }
                }
            }
        }
    }
}

fn try_arm(state: &mut BridgeState, slot: &CaptureSlot) -> Result<(), EngineError> {
    let discovery = state.discovery.as_ref().ok_or(EngineError::NotConnected)?;

    let mut variables = Vec::with_capacity(slot.settings.signals.len());
    for &index in &slot.settings.signals {
        let name = usize::try_from(index)
            .ok()
            .and_then(|i| discovery.signals.get(i))
            .ok_or_else(|| EngineError::Discovery(format!("signal index {index} out of range")))?;
        variables.push(name.clone());
    }

    let trigger = if slot.settings.trigger_signal >= 0 {
        let variable = discovery
            .signals
            .get(slot.settings.trigger_signal as usize)
            .ok_or_else(|| {
                EngineError::Discovery(format!(
                    "trigger signal index {} out of range",
                    slot.settings.trigger_signal
                ))
            })?;
        Some(TriggerSpec {
            variable: variable.clone(),
            threshold: slot.settings.trigger_threshold,
            edge: TriggerEdge::from_wire(slot.settings.trigger_edge),
            delay_samples: slot.settings.trigger_delay,
        })
    } else {
        None
    };

    let spec = ArmSpec {
        variables,
        downsampling: slot.settings.decimation,
        stop_after_samples: slot.settings.num_samples as u64 * slot.settings.decimation,
        trigger,
    };

    let session = state.session.as_mut().ok_or(EngineError::NotConnected)?;
    if session.state() != CaptureState::Configured {
        session.stop();
    }
    session.arm(&spec)?;
    debug!(channels = spec.variables.len(), "capture armed");
    Ok(())
}

/// Validates a fetch result and reshapes the channel-major vectors into one
/// sample-major buffer (`index = sample * num_signals + signal`), clamped to
/// the requested sample count.
fn collect_samples(data: CaptureData, settings: &CaptureSettings) -> Result<Vec<f64>, String> {
    if data.groups.len() != 1 {
        return Err(format!("expected one signal group, got {}", data.groups.len()));
    }
    let group = &data.groups[0];
    if group.y.len() != settings.signals.len() {
        return Err(format!(
            "expected {} channels, got {}",
            settings.signals.len(),
            group.y.len()
        ));
    }
    if group.x.is_empty() {
        return Err("capture produced no samples".into());
    }
    let limit = group.x.len().min(settings.num_samples);
    Ok(flatten_sample_major(&group.y, limit))
}

fn flatten_sample_major(channels: &[Vec<f64>], limit: usize) -> Vec<f64> {
    let num_channels = channels.len();
    let mut out = vec![0.0; limit * num_channels];
    for (signal, channel) in channels.iter().enumerate() {
        for (sample, value) in channel.iter().take(limit).enumerate() {
            out[sample * num_channels + signal] = *value;
        }
    }
    out
}

fn send_scope_reply(transport: &dyn Transport, reply: &ScopeReply) {
    match message::encode(reply) {
        Ok(raw) => {
            if !transport.send(&raw) {
                warn!(
                    transaction_id = reply.transaction_id,
                    "scope reply not delivered"
                );
            }
        }
        Err(e) => error!(error = %e, "failed to encode scope reply"),
    }
}
