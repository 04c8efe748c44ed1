use thiserror::Error;

use crate::events::domain::frame_alerts::AlertKind;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification credentials missing: {0}")]
    MissingCredentials(&'static str),
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Outbound notification transport.
///
/// Called from dispatch threads, so implementations must be shareable.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: AlertKind, message: &str) -> Result<(), NotifyError>;
}

/// Accepts and drops every notification. Stands in when the real
/// transport is not configured.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, kind: AlertKind, _message: &str) -> Result<(), NotifyError> {
        log::debug!("Notifier disabled; dropping {kind} alert");
        Ok(())
    }
}
