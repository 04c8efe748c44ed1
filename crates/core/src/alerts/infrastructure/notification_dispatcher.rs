use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::alerts::domain::alert_gate::FiredAlert;
use crate::alerts::domain::notifier::Notifier;
use crate::events::domain::frame_alerts::AlertKind;

/// Result of one background notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub kind: AlertKind,
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Sends fired alerts off the frame-processing thread.
///
/// Each alert gets its own short-lived thread so a slow or failing
/// transport never stalls frame handling. Failures are logged and
/// reported on the outcome channel; they are never retried.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    outcome_tx: Sender<DispatchOutcome>,
    outcome_rx: Receiver<DispatchOutcome>,
    handles: Vec<JoinHandle<()>>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        Self {
            notifier,
            outcome_tx,
            outcome_rx,
            handles: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, alert: FiredAlert) {
        self.handles.retain(|h| !h.is_finished());

        let notifier = Arc::clone(&self.notifier);
        let tx = self.outcome_tx.clone();
        let handle = std::thread::spawn(move || {
            let error = match notifier.notify(alert.kind, &alert.message) {
                Ok(()) => None,
                Err(e) => {
                    log::error!("Failed to send {} alert: {e}", alert.kind);
                    Some(e.to_string())
                }
            };
            let _ = tx.send(DispatchOutcome {
                kind: alert.kind,
                error,
            });
        });
        self.handles.push(handle);
    }

    pub fn dispatch_all(&mut self, alerts: impl IntoIterator<Item = FiredAlert>) {
        for alert in alerts {
            self.dispatch(alert);
        }
    }

    /// Outcomes that have already arrived, without blocking.
    pub fn drain_outcomes(&self) -> Vec<DispatchOutcome> {
        self.outcome_rx.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<DispatchOutcome> {
        match self.outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Blocks until every spawned send has finished.
    pub fn wait(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Notification thread panicked");
            }
        }
    }
}
