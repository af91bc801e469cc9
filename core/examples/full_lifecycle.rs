// gavel/examples/full_lifecycle.rs

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use gavel::{
  AuctionEngine, Clock, EngineConfig, EngineError, ManualClock, MemoryStore, MockMailer, MockPaymentGateway,
  MockPayoutService, NewAuction, SellerDecision, Store,
};

#[tokio::main]
async fn main() -> Result<(), EngineError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Full Auction Lifecycle Example ---");

  // A manual clock lets the example fast-forward to the close instead of
  // waiting for real time to pass.
  let clock = ManualClock::new(Utc::now());
  let store = Arc::new(MemoryStore::new());
  let engine = AuctionEngine::new(
    Arc::clone(&store) as Arc<dyn Store>,
    Arc::new(MockPaymentGateway),
    Arc::new(MockPayoutService),
    Arc::new(MockMailer),
    Arc::new(clock.clone()) as Arc<dyn Clock>,
    EngineConfig::default(),
  );

  let seller = Uuid::new_v4();
  let alice = Uuid::new_v4();
  let bob = Uuid::new_v4();

  // 1. Seller lists a lot and moderation approves it.
  let auction = engine
    .create_auction(NewAuction {
      seller_id: seller,
      title: "Edwardian writing desk".to_string(),
      description: "Oak, restored".to_string(),
      category: "furniture".to_string(),
      start_price_cents: 10_000,
      reserve_price_cents: 50_000,
      start_date: clock.now() - Duration::minutes(1),
      end_date: clock.now() + Duration::hours(24),
    })
    .await?;
  engine.submit_for_review(auction.id, seller).await?;
  engine.moderator_approve(auction.id).await?;
  info!("Listed and approved: {}", auction.id);

  // 2. Bidding. A duplicate amount loses with the price to beat.
  engine.place_bid(auction.id, alice, 30_000, false).await?;
  engine.place_bid(auction.id, bob, 45_000, true).await?;
  match engine.place_bid(auction.id, alice, 45_000, false).await {
    Err(EngineError::BidTooLow { current_price_cents }) => {
      info!("Equal bid rejected; price to beat is {} cents", current_price_cents)
    }
    other => panic!("expected BidTooLow, got {:?}", other.map(|b| b.amount_cents)),
  }

  // 3. The close: highest bid is below the 50_000 reserve, so the seller
  //    decides, and accepts.
  clock.advance(Duration::hours(25));
  engine.scheduler().sweep_once().await;
  info!("After sweep: {:?}", engine_status(&store, auction.id).await);

  engine.seller_decide(auction.id, seller, SellerDecision::Accept).await?;
  info!("Seller accepted: {:?}", engine_status(&store, auction.id).await);

  // 4. The gateway confirms the charge; the seller ships; payout releases.
  engine.settlement().on_payment_completed(auction.id).await?;
  engine.submit_fulfillment(auction.id, seller, "RM-1234-5678").await?;
  info!("Settled: {:?}", engine_status(&store, auction.id).await);

  Ok(())
}

async fn engine_status(store: &Arc<MemoryStore>, auction_id: Uuid) -> (gavel::AuctionStatus, Option<gavel::PaymentState>) {
  let auction = store
    .get_auction(auction_id)
    .await
    .expect("store")
    .expect("auction exists");
  (auction.status, auction.payment_status)
}
