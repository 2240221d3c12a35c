use crate::pipeline::candidate::NotificationCandidate;
use crate::sms::MessagingService;

/// Sends one admitted candidate's message. Failures are captured in
/// the returned outcome line, never propagated; there are no retries.
pub struct Dispatcher<'a> {
    messaging: &'a dyn MessagingService,
    dry_run: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(messaging: &'a dyn MessagingService, dry_run: bool) -> Self {
        Self { messaging, dry_run }
    }

    pub async fn dispatch(&self, candidate: &NotificationCandidate) -> String {
        if self.dry_run {
            tracing::info!(
                "Dry run, skipping send to {}",
                candidate.phone_number
            );
            return format!(
                "Simulated notification for {} at {}: {}",
                candidate.recipient_name, candidate.phone_number, candidate.message
            );
        }

        match self
            .messaging
            .send(&candidate.phone_number, &candidate.message)
            .await
        {
            Ok(delivery_id) => {
                tracing::debug!("Delivered {} to {}", delivery_id, candidate.phone_number);
                format!(
                    "Notified {} at {}: {}",
                    candidate.recipient_name, candidate.phone_number, candidate.message
                )
            }
            Err(e) => {
                tracing::error!("Send to {} failed: {:#}", candidate.phone_number, e);
                format!(
                    "Failed to notify {} at {}: {}",
                    candidate.recipient_name, candidate.phone_number, e
                )
            }
        }
    }
}
