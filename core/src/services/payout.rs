// gavel/src/services/payout.rs

use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

/// Payout seam. Called exactly once per auction, on fulfillment; the
/// at-most-once guarantee lives in the settlement coordinator, not here.
#[async_trait]
pub trait PayoutService: Send + Sync {
  async fn release_payout(&self, seller_id: Uuid, amount_cents: i64, payment_id: Uuid) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MockPayoutService;

#[async_trait]
impl PayoutService for MockPayoutService {
  #[instrument(skip(self), fields(%seller_id, amount_cents, %payment_id))]
  async fn release_payout(&self, seller_id: Uuid, amount_cents: i64, payment_id: Uuid) -> anyhow::Result<()> {
    info!("Simulating payout release");
    tokio::time::sleep(std::time::Duration::from_millis(10)).await; // Simulate network latency
    info!("Mock payout of {} cents released to seller {}", amount_cents, seller_id);
    Ok(())
  }
}
