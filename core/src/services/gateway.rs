// gavel/src/services/gateway.rs

use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

/// Payment gateway seam. The engine initiates a charge and later reacts to
/// completed/failed callbacks routed to the settlement coordinator; it
/// never parses gateway payloads beyond the opaque reference.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Starts a charge for the winning buyer. Returns the gateway's opaque
  /// reference, stored on the payment row for callback correlation.
  async fn initiate_charge(&self, auction_id: Uuid, amount_cents: i64, buyer_id: Uuid) -> anyhow::Result<String>;
}

#[derive(Debug, Default)]
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(skip(self), fields(%auction_id, amount_cents, %buyer_id))]
  async fn initiate_charge(&self, auction_id: Uuid, amount_cents: i64, buyer_id: Uuid) -> anyhow::Result<String> {
    info!("Simulating charge initiation");
    if amount_cents <= 0 {
      anyhow::bail!("Charge amount must be greater than zero");
    }
    tokio::time::sleep(std::time::Duration::from_millis(10)).await; // Simulate network latency

    let reference = format!("mock_charge_{}", Uuid::new_v4());
    info!("Mock charge initiated. Gateway reference: {}", reference);
    Ok(reference)
  }
}
