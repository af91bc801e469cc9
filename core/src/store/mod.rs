// gavel/src/store/mod.rs

//! Durable storage seam. The engine coordinates exclusively through this
//! trait; backends must provide per-auction atomicity for `commit_bid` and
//! an atomic check-and-insert for notification records.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{Auction, Bid, NotificationRecord, Payment, PaymentState};

pub use memory::MemoryStore;

/// Storage operations report opaque backend failures; the engine wraps
/// them into `EngineError::Storage`.
pub type StoreResult<T> = anyhow::Result<T>;

#[async_trait]
pub trait Store: Send + Sync {
  async fn insert_auction(&self, auction: Auction) -> StoreResult<()>;
  async fn get_auction(&self, id: Uuid) -> StoreResult<Option<Auction>>;

  /// Full-row replacement. Callers construct the complete post-transition
  /// row so a single write applies the whole transition.
  async fn update_auction(&self, auction: Auction) -> StoreResult<()>;

  /// Active auctions whose end date has passed.
  async fn list_due_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<Auction>>;

  /// Active auctions inside the "ending soon" lead window (not yet due).
  async fn list_ending_soon(&self, now: DateTime<Utc>, lead: Duration) -> StoreResult<Vec<Auction>>;

  /// Ended auctions with an unpaid payment past its due date.
  async fn list_payment_overdue(&self, now: DateTime<Utc>) -> StoreResult<Vec<Auction>>;

  /// The bid-acceptance critical section: atomically, iff the auction's
  /// current price still equals `expected_price_cents` and the bid amount
  /// strictly exceeds it, persist the bid, raise the price, and apply the
  /// optional anti-snipe end-date extension. Returns false on a lost race
  /// (no writes happened); callers re-read and retry.
  async fn commit_bid(
    &self,
    bid: &Bid,
    expected_price_cents: i64,
    new_end_date: Option<DateTime<Utc>>,
  ) -> StoreResult<bool>;

  async fn bids_for_auction(&self, auction_id: Uuid) -> StoreResult<Vec<Bid>>;

  async fn insert_payment(&self, payment: Payment) -> StoreResult<()>;
  async fn get_payment_by_auction(&self, auction_id: Uuid) -> StoreResult<Option<Payment>>;
  async fn update_payment(&self, payment: Payment) -> StoreResult<()>;

  /// Atomic dedup primitive: insert iff no record with the same
  /// `(kind, reference, user_id)` exists. Returns true when inserted.
  async fn insert_notification_if_absent(&self, record: NotificationRecord) -> StoreResult<bool>;
}

/// Convenience used by sweep queries: payment states that still count as
/// "unpaid" for deadline purposes.
pub(crate) fn is_unpaid(state: Option<PaymentState>) -> bool {
  matches!(state, Some(PaymentState::Pending) | Some(PaymentState::Processing))
}
