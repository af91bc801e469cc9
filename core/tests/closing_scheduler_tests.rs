// tests/closing_scheduler_tests.rs
mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::*;
use gavel::{
  Auction, AuctionEngine, AuctionStatus, Bid, Clock, EngineConfig, ManualClock, MemoryStore, MockMailer,
  MockPaymentGateway, MockPayoutService, NotificationKind, NotificationRecord, Payment, PaymentState, Store,
  StoreResult,
};
use parking_lot::RwLock;
use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

/// Delegating store that fails `bids_for_auction` for one auction id, so
/// a sweep hits a storage error on exactly that close.
struct FaultyBidsStore {
  inner: Arc<MemoryStore>,
  fail_for: RwLock<Option<Uuid>>,
}

#[async_trait]
impl Store for FaultyBidsStore {
  async fn insert_auction(&self, auction: Auction) -> StoreResult<()> {
    self.inner.insert_auction(auction).await
  }

  async fn get_auction(&self, id: Uuid) -> StoreResult<Option<Auction>> {
    self.inner.get_auction(id).await
  }

  async fn update_auction(&self, auction: Auction) -> StoreResult<()> {
    self.inner.update_auction(auction).await
  }

  async fn list_due_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<Auction>> {
    self.inner.list_due_auctions(now).await
  }

  async fn list_ending_soon(&self, now: DateTime<Utc>, lead: Duration) -> StoreResult<Vec<Auction>> {
    self.inner.list_ending_soon(now, lead).await
  }

  async fn list_payment_overdue(&self, now: DateTime<Utc>) -> StoreResult<Vec<Auction>> {
    self.inner.list_payment_overdue(now).await
  }

  async fn commit_bid(&self, bid: &Bid, expected_price_cents: i64, new_end_date: Option<DateTime<Utc>>) -> StoreResult<bool> {
    self.inner.commit_bid(bid, expected_price_cents, new_end_date).await
  }

  async fn bids_for_auction(&self, auction_id: Uuid) -> StoreResult<Vec<Bid>> {
    if *self.fail_for.read() == Some(auction_id) {
      anyhow::bail!("simulated storage failure for auction {}", auction_id);
    }
    self.inner.bids_for_auction(auction_id).await
  }

  async fn insert_payment(&self, payment: Payment) -> StoreResult<()> {
    self.inner.insert_payment(payment).await
  }

  async fn get_payment_by_auction(&self, auction_id: Uuid) -> StoreResult<Option<Payment>> {
    self.inner.get_payment_by_auction(auction_id).await
  }

  async fn update_payment(&self, payment: Payment) -> StoreResult<()> {
    self.inner.update_payment(payment).await
  }

  async fn insert_notification_if_absent(&self, record: NotificationRecord) -> StoreResult<bool> {
    self.inner.insert_notification_if_absent(record).await
  }
}

#[tokio::test]
#[serial]
async fn auction_without_bids_just_ends() {
  setup_tracing();
  let rig = build_rig();
  let seller = Uuid::new_v4();
  let id = rig.active_auction(seller, 100, 500, 2).await;

  rig.close(id).await;

  let auction = rig.auction(id).await;
  assert_eq!(auction.status, AuctionStatus::Ended);
  assert!(auction.winning_bidder_id.is_none());
  assert!(auction.payment_due_date.is_none());
  assert_eq!(rig.mailer.sent_to(seller), vec![NotificationKind::AuctionEnded]);
}

// Start 100, reserve 500, bids [300, 600]: the 600 bid clears the
// reserve, so the close records the winner and opens the payment window.
#[tokio::test]
#[serial]
async fn reserve_met_closes_with_winner_and_payment_window() {
  setup_tracing();
  let rig = build_rig();
  let seller = Uuid::new_v4();
  let alice = Uuid::new_v4();
  let bob = Uuid::new_v4();
  let id = rig.active_auction(seller, 100, 500, 2).await;

  rig.engine.place_bid(id, alice, 300, false).await.expect("alice");
  rig.engine.place_bid(id, bob, 600, false).await.expect("bob");

  rig.close(id).await;

  let auction = rig.auction(id).await;
  assert_eq!(auction.status, AuctionStatus::Ended);
  assert_eq!(auction.winning_bidder_id, Some(bob));
  // Mock gateway accepted the charge, so the projection reads Processing.
  assert_eq!(auction.payment_status, Some(PaymentState::Processing));
  assert_eq!(
    auction.payment_due_date,
    Some(rig.clock.now() + rig.engine.config().payment_window)
  );

  let payment = rig
    .store
    .get_payment_by_auction(id)
    .await
    .expect("store")
    .expect("payment row");
  assert_eq!(payment.amount_cents, 600);
  assert_eq!(payment.buyer_id, bob);
  assert!(payment.gateway_ref.is_some());

  assert!(rig.mailer.sent_to(bob).contains(&NotificationKind::AuctionWon));
  assert!(rig.mailer.sent_to(alice).contains(&NotificationKind::AuctionLost));
  assert!(rig.mailer.sent_to(seller).contains(&NotificationKind::AuctionEnded));
}

// Start 100, reserve 500, bids [300@t1, 450@t2, 450@t3]: the equal third
// bid is rejected, and the close picks 450@t2 which is below reserve.
#[tokio::test]
#[serial]
async fn below_reserve_goes_to_seller_decision() {
  setup_tracing();
  let rig = build_rig();
  let seller = Uuid::new_v4();
  let first = Uuid::new_v4();
  let second = Uuid::new_v4();
  let third = Uuid::new_v4();
  let id = rig.active_auction(seller, 100, 500, 2).await;

  rig.engine.place_bid(id, first, 300, false).await.expect("t1");
  rig.clock.advance(Duration::seconds(10));
  rig.engine.place_bid(id, second, 450, false).await.expect("t2");
  rig.clock.advance(Duration::seconds(10));
  let err = rig.engine.place_bid(id, third, 450, false).await.unwrap_err();
  assert!(matches!(err, gavel::EngineError::BidTooLow { current_price_cents: 450 }));

  rig.close(id).await;

  let auction = rig.auction(id).await;
  assert_eq!(auction.status, AuctionStatus::PendingSellerDecision);
  assert!(auction.winning_bidder_id.is_none());
  assert!(rig.mailer.sent_to(seller).contains(&NotificationKind::ReserveNotMet));
  // No payment until the seller decides.
  assert!(rig
    .store
    .get_payment_by_auction(id)
    .await
    .expect("store")
    .is_none());
}

#[tokio::test]
#[serial]
async fn rerunning_the_sweep_is_a_noop() {
  setup_tracing();
  let rig = build_rig();
  let seller = Uuid::new_v4();
  let bidder = Uuid::new_v4();
  let id = rig.active_auction(seller, 100, 500, 2).await;
  rig.engine.place_bid(id, bidder, 700, false).await.expect("bid");

  rig.close(id).await;
  let writes_after_close = rig.store.write_count();
  let notices_after_close = rig.store.notification_records().len();
  let emails_after_close = rig.mailer.sent.lock().len();

  // Crash-and-rerun: the second sweep must find nothing due, write
  // nothing, and deliver nothing.
  let summary = rig.engine.scheduler().sweep_once().await;
  assert_eq!(summary.processed, 0);
  assert_eq!(summary.failed, 0);
  assert_eq!(rig.store.write_count(), writes_after_close);
  assert_eq!(rig.store.notification_records().len(), notices_after_close);
  assert_eq!(rig.mailer.sent.lock().len(), emails_after_close);
}

#[tokio::test]
#[serial]
async fn sweep_closes_all_due_auctions() {
  setup_tracing();
  let rig = build_rig();
  let seller = Uuid::new_v4();
  let a = rig.active_auction(seller, 100, 500, 1).await;
  let b = rig.active_auction(seller, 100, 500, 2).await;
  let c = rig.active_auction(seller, 100, 500, 72).await;

  rig.clock.advance(Duration::hours(3));
  let summary = rig.engine.scheduler().sweep_once().await;
  assert_eq!(summary.processed, 2);

  assert_eq!(rig.auction(a).await.status, AuctionStatus::Ended);
  assert_eq!(rig.auction(b).await.status, AuctionStatus::Ended);
  assert_eq!(rig.auction(c).await.status, AuctionStatus::Active);
}

#[tokio::test]
#[serial]
async fn one_failing_auction_does_not_abort_the_sweep() {
  setup_tracing();
  let store = Arc::new(FaultyBidsStore {
    inner: Arc::new(MemoryStore::new()),
    fail_for: RwLock::new(None),
  });
  let clock = ManualClock::new(t0());
  let engine = AuctionEngine::new(
    Arc::clone(&store) as Arc<dyn Store>,
    Arc::new(MockPaymentGateway),
    Arc::new(MockPayoutService),
    Arc::new(MockMailer),
    Arc::new(clock.clone()) as Arc<dyn Clock>,
    EngineConfig::default(),
  );

  let seller = Uuid::new_v4();
  let mut ids = Vec::new();
  for _ in 0..3 {
    let auction = engine
      .create_auction(gavel::NewAuction {
        seller_id: seller,
        title: "Lot".to_string(),
        description: String::new(),
        category: "misc".to_string(),
        start_price_cents: 100,
        reserve_price_cents: 500,
        start_date: t0() - Duration::minutes(1),
        end_date: t0() + Duration::hours(2),
      })
      .await
      .expect("create");
    engine.submit_for_review(auction.id, seller).await.expect("submit");
    engine.moderator_approve(auction.id).await.expect("approve");
    ids.push(auction.id);
  }

  *store.fail_for.write() = Some(ids[1]);
  clock.advance(Duration::hours(3));

  let summary = engine.scheduler().sweep_once().await;
  assert_eq!(summary.processed, 2);
  assert_eq!(summary.failed, 1);

  let status = |id| {
    let store = Arc::clone(&store);
    async move { store.get_auction(id).await.expect("store").expect("auction").status }
  };
  assert_eq!(status(ids[0]).await, AuctionStatus::Ended);
  assert_eq!(status(ids[2]).await, AuctionStatus::Ended);
  // The poisoned auction is untouched, and a later healthy sweep picks
  // it up.
  assert_eq!(status(ids[1]).await, AuctionStatus::Active);

  *store.fail_for.write() = None;
  let summary = engine.scheduler().sweep_once().await;
  assert_eq!(summary.processed, 1);
  assert_eq!(summary.failed, 0);
  assert_eq!(status(ids[1]).await, AuctionStatus::Ended);
}

#[tokio::test]
#[serial]
async fn ending_soon_notifies_each_bidder_once() {
  setup_tracing();
  let rig = build_rig();
  let seller = Uuid::new_v4();
  let alice = Uuid::new_v4();
  let bob = Uuid::new_v4();
  let id = rig.active_auction(seller, 100, 500, 2).await;
  rig.engine.place_bid(id, alice, 200, false).await.expect("alice");
  rig.engine.place_bid(id, bob, 300, false).await.expect("bob");

  // Not yet inside the lead window: nothing goes out.
  rig.engine.scheduler().sweep_ending_soon().await;
  assert_eq!(rig.mailer.count_of(NotificationKind::AuctionEndingSoon), 0);

  rig.clock.advance(Duration::minutes(80)); // 40 minutes to go
  rig.engine.scheduler().sweep_ending_soon().await;
  assert_eq!(rig.mailer.count_of(NotificationKind::AuctionEndingSoon), 2);

  // Another tick inside the window: deduped, no repeats.
  rig.clock.advance(Duration::minutes(5));
  rig.engine.scheduler().sweep_ending_soon().await;
  assert_eq!(rig.mailer.count_of(NotificationKind::AuctionEndingSoon), 2);
}

#[tokio::test]
#[serial]
async fn lapsed_payment_window_fails_the_payment() {
  setup_tracing();
  let rig = build_rig();
  let seller = Uuid::new_v4();
  let bidder = Uuid::new_v4();
  let id = rig.active_auction(seller, 100, 500, 2).await;
  rig.engine.place_bid(id, bidder, 900, false).await.expect("bid");

  rig.close(id).await;
  assert_eq!(rig.auction(id).await.payment_status, Some(PaymentState::Processing));

  // Within the window nothing happens.
  rig.engine.scheduler().sweep_payment_deadlines().await;
  assert_eq!(rig.auction(id).await.payment_status, Some(PaymentState::Processing));

  rig.clock.advance(Duration::hours(25));
  rig.engine.scheduler().sweep_payment_deadlines().await;

  let auction = rig.auction(id).await;
  assert_eq!(auction.payment_status, Some(PaymentState::Failed));
  // Reserve was met, so the auction stays Ended (unpaid).
  assert_eq!(auction.status, AuctionStatus::Ended);
  assert!(rig.mailer.sent_to(seller).contains(&NotificationKind::PaymentFailed));
}
