// gavel/src/services/mailer.rs

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::models::NotificationPayload;

/// Mailer seam. Fire-and-forget from the engine's perspective: a failure
/// here is logged by the dispatcher and never rolls back a state
/// transition.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, user_id: Uuid, payload: &NotificationPayload) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MockMailer;

#[async_trait]
impl Mailer for MockMailer {
  async fn send(&self, user_id: Uuid, payload: &NotificationPayload) -> anyhow::Result<()> {
    let body = serde_json::to_string(payload)?;
    info!("Simulating email: To='{}', Body={}", user_id, body);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await; // Simulate network latency

    let message_id = format!("mock_email_{}", Uuid::new_v4());
    info!("Mock email sent successfully. Message ID: {}", message_id);
    Ok(())
  }
}
