//! Delivery transport seam.
//!
//! Actual SMTP delivery is out of scope; [`SimulatedTransport`] stands in
//! for a production provider (SendGrid, SES, ...) behind the same trait.

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// A fully rendered, per-recipient outbound message.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub campaign_id: String,
    pub contact_id: String,
}

pub trait Transport: Send + Sync {
    fn send(&self, message: &OutboundEmail) -> Result<(), TransportError>;
}

type FailurePredicate = Box<dyn Fn(&OutboundEmail) -> bool + Send + Sync>;

/// Transport that logs instead of delivering. An optional failure predicate
/// lets tests exercise the per-recipient failure path.
#[derive(Default)]
pub struct SimulatedTransport {
    fail_when: Option<FailurePredicate>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self { fail_when: None }
    }

    /// Fail delivery for any message matching `predicate`.
    pub fn failing_when(
        predicate: impl Fn(&OutboundEmail) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            fail_when: Some(Box::new(predicate)),
        }
    }
}

impl Transport for SimulatedTransport {
    fn send(&self, message: &OutboundEmail) -> Result<(), TransportError> {
        if let Some(predicate) = &self.fail_when {
            if predicate(message) {
                return Err(TransportError::Rejected(format!(
                    "simulated rejection for {}",
                    message.to
                )));
            }
        }
        debug!(
            to = %message.to,
            campaign_id = %message.campaign_id,
            subject = %message.subject,
            "Simulated email delivery"
        );
        Ok(())
    }
}
