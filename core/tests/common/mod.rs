// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;
use uuid::Uuid;

use gavel::{
  AuctionEngine, AuctionStatus, Clock, EngineConfig, Mailer, ManualClock, MemoryStore, MockPaymentGateway, NewAuction,
  NotificationKind, NotificationPayload, PaymentGateway, PayoutService, Store,
};

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// A fixed, readable origin for test time.
pub fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

// --- Recording collaborators ---

/// Mailer that records every delivery for assertions.
#[derive(Default)]
pub struct RecordingMailer {
  pub sent: Mutex<Vec<(Uuid, NotificationKind)>>,
}

impl RecordingMailer {
  pub fn sent_to(&self, user_id: Uuid) -> Vec<NotificationKind> {
    self
      .sent
      .lock()
      .iter()
      .filter(|(u, _)| *u == user_id)
      .map(|(_, k)| *k)
      .collect()
  }

  pub fn count_of(&self, kind: NotificationKind) -> usize {
    self.sent.lock().iter().filter(|(_, k)| *k == kind).count()
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, user_id: Uuid, payload: &NotificationPayload) -> anyhow::Result<()> {
    self.sent.lock().push((user_id, payload.kind()));
    Ok(())
  }
}

/// Payout service that counts releases; the settlement tests assert
/// exactly-once.
#[derive(Default)]
pub struct CountingPayout {
  pub releases: AtomicUsize,
}

impl CountingPayout {
  pub fn count(&self) -> usize {
    self.releases.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PayoutService for CountingPayout {
  async fn release_payout(&self, _seller_id: Uuid, _amount_cents: i64, _payment_id: Uuid) -> anyhow::Result<()> {
    self.releases.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

/// Gateway whose charge initiation always fails; payments stay pending.
#[derive(Default)]
pub struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
  async fn initiate_charge(&self, _auction_id: Uuid, _amount_cents: i64, _buyer_id: Uuid) -> anyhow::Result<String> {
    anyhow::bail!("gateway unreachable")
  }
}

// --- Engine fixture ---

pub struct TestRig {
  pub engine: Arc<AuctionEngine>,
  pub store: Arc<MemoryStore>,
  pub mailer: Arc<RecordingMailer>,
  pub payout: Arc<CountingPayout>,
  pub clock: ManualClock,
}

pub fn build_rig() -> TestRig {
  build_rig_with(EngineConfig::default(), false)
}

pub fn build_rig_with(config: EngineConfig, failing_gateway: bool) -> TestRig {
  let store = Arc::new(MemoryStore::new());
  let mailer = Arc::new(RecordingMailer::default());
  let payout = Arc::new(CountingPayout::default());
  let clock = ManualClock::new(t0());

  let gateway: Arc<dyn PaymentGateway> = if failing_gateway {
    Arc::new(FailingGateway)
  } else {
    Arc::new(MockPaymentGateway)
  };

  let engine = Arc::new(AuctionEngine::new(
    Arc::clone(&store) as Arc<dyn Store>,
    gateway,
    Arc::clone(&payout) as Arc<dyn PayoutService>,
    Arc::clone(&mailer) as Arc<dyn Mailer>,
    Arc::new(clock.clone()) as Arc<dyn Clock>,
    config,
  ));

  TestRig {
    engine,
    store,
    mailer,
    payout,
    clock,
  }
}

impl TestRig {
  /// Creates, submits and approves a listing so it is live at `t0()`,
  /// running for `hours` hours.
  pub async fn active_auction(&self, seller: Uuid, start_cents: i64, reserve_cents: i64, hours: i64) -> Uuid {
    let auction = self
      .engine
      .create_auction(NewAuction {
        seller_id: seller,
        title: "Walnut bureau".to_string(),
        description: "Mid-century, some scratches".to_string(),
        category: "furniture".to_string(),
        start_price_cents: start_cents,
        reserve_price_cents: reserve_cents,
        start_date: t0() - Duration::minutes(1),
        end_date: t0() + Duration::hours(hours),
      })
      .await
      .expect("create");
    self
      .engine
      .submit_for_review(auction.id, seller)
      .await
      .expect("submit for review");
    let approved = self.engine.moderator_approve(auction.id).await.expect("approve");
    assert_eq!(approved.status, AuctionStatus::Active);
    auction.id
  }

  pub async fn auction(&self, id: Uuid) -> gavel::Auction {
    self
      .store
      .get_auction(id)
      .await
      .expect("store")
      .expect("auction exists")
  }

  /// Moves the clock past the auction's end date and runs the closing
  /// sweep once.
  pub async fn close(&self, id: Uuid) {
    let auction = self.auction(id).await;
    let past_end = auction.end_date + Duration::seconds(1);
    if self.clock.now() < past_end {
      self.clock.set(past_end);
    }
    self.engine.scheduler().sweep_once().await;
  }
}
