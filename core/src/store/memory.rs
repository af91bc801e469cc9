// gavel/src/store/memory.rs

//! In-memory `Store` backend over `parking_lot::RwLock`'d maps. Used by the
//! test suites and the runnable examples; a SQL backend would implement the
//! same trait with row locks or conditional updates.
//!
//! Lock guards are blocking and are never held across an `.await` point;
//! every method takes the lock, finishes its work, and drops the guard
//! before returning control to the executor.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use super::{is_unpaid, Store, StoreResult};
use crate::models::{Auction, AuctionStatus, Bid, NotificationKind, NotificationRecord, Payment};

#[derive(Default)]
pub struct MemoryStore {
  auctions: RwLock<HashMap<Uuid, Auction>>,
  bids: RwLock<HashMap<Uuid, Vec<Bid>>>,
  payments: RwLock<HashMap<Uuid, Payment>>, // keyed by auction id
  notifications: RwLock<Vec<NotificationRecord>>,
  // Counts successful mutating operations; handy for idempotence checks.
  writes: AtomicU64,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Total successful mutating operations so far.
  pub fn write_count(&self) -> u64 {
    self.writes.load(Ordering::SeqCst)
  }

  /// Snapshot of every notification record, in insertion order.
  pub fn notification_records(&self) -> Vec<NotificationRecord> {
    self.notifications.read().clone()
  }

  /// Records matching a kind, for assertions.
  pub fn notifications_of_kind(&self, kind: NotificationKind) -> Vec<NotificationRecord> {
    self
      .notifications
      .read()
      .iter()
      .filter(|r| r.kind == kind)
      .cloned()
      .collect()
  }

  fn bump(&self) {
    self.writes.fetch_add(1, Ordering::SeqCst);
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn insert_auction(&self, auction: Auction) -> StoreResult<()> {
    self.auctions.write().insert(auction.id, auction);
    self.bump();
    Ok(())
  }

  async fn get_auction(&self, id: Uuid) -> StoreResult<Option<Auction>> {
    Ok(self.auctions.read().get(&id).cloned())
  }

  async fn update_auction(&self, auction: Auction) -> StoreResult<()> {
    let mut guard = self.auctions.write();
    if !guard.contains_key(&auction.id) {
      anyhow::bail!("update of unknown auction {}", auction.id);
    }
    guard.insert(auction.id, auction);
    drop(guard);
    self.bump();
    Ok(())
  }

  async fn list_due_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<Auction>> {
    Ok(
      self
        .auctions
        .read()
        .values()
        .filter(|a| a.status == AuctionStatus::Active && a.end_date <= now)
        .cloned()
        .collect(),
    )
  }

  async fn list_ending_soon(&self, now: DateTime<Utc>, lead: Duration) -> StoreResult<Vec<Auction>> {
    Ok(
      self
        .auctions
        .read()
        .values()
        .filter(|a| a.status == AuctionStatus::Active && a.end_date > now && a.end_date - lead <= now)
        .cloned()
        .collect(),
    )
  }

  async fn list_payment_overdue(&self, now: DateTime<Utc>) -> StoreResult<Vec<Auction>> {
    Ok(
      self
        .auctions
        .read()
        .values()
        .filter(|a| {
          a.status == AuctionStatus::Ended
            && is_unpaid(a.payment_status)
            && a.payment_due_date.is_some_and(|due| due <= now)
        })
        .cloned()
        .collect(),
    )
  }

  async fn commit_bid(
    &self,
    bid: &Bid,
    expected_price_cents: i64,
    new_end_date: Option<DateTime<Utc>>,
  ) -> StoreResult<bool> {
    // One write lock over the auction map serializes all bid commits; the
    // compare below makes the price update conditional, so a raced caller
    // observes false and retries against the fresh price.
    let mut auctions = self.auctions.write();
    let auction = auctions
      .get_mut(&bid.auction_id)
      .ok_or_else(|| anyhow::anyhow!("bid commit against unknown auction {}", bid.auction_id))?;

    if auction.current_price_cents != expected_price_cents || bid.amount_cents <= auction.current_price_cents {
      return Ok(false);
    }

    auction.current_price_cents = bid.amount_cents;
    if let Some(end) = new_end_date {
      auction.end_date = end;
    }
    auction.updated_at = bid.created_at;
    // The bid row lands while the auction guard is still held: no reader
    // may observe the raised price without the bid that set it.
    self.bids.write().entry(bid.auction_id).or_default().push(bid.clone());
    drop(auctions);

    self.bump();
    Ok(true)
  }

  async fn bids_for_auction(&self, auction_id: Uuid) -> StoreResult<Vec<Bid>> {
    Ok(self.bids.read().get(&auction_id).cloned().unwrap_or_default())
  }

  async fn insert_payment(&self, payment: Payment) -> StoreResult<()> {
    self.payments.write().insert(payment.auction_id, payment);
    self.bump();
    Ok(())
  }

  async fn get_payment_by_auction(&self, auction_id: Uuid) -> StoreResult<Option<Payment>> {
    Ok(self.payments.read().get(&auction_id).cloned())
  }

  async fn update_payment(&self, payment: Payment) -> StoreResult<()> {
    let mut guard = self.payments.write();
    if !guard.contains_key(&payment.auction_id) {
      anyhow::bail!("update of unknown payment for auction {}", payment.auction_id);
    }
    guard.insert(payment.auction_id, payment);
    drop(guard);
    self.bump();
    Ok(())
  }

  async fn insert_notification_if_absent(&self, record: NotificationRecord) -> StoreResult<bool> {
    let mut guard = self.notifications.write();
    let exists = guard
      .iter()
      .any(|r| r.kind == record.kind && r.reference == record.reference && r.user_id == record.user_id);
    if exists {
      return Ok(false);
    }
    guard.push(record);
    drop(guard);
    self.bump();
    Ok(true)
  }
}
