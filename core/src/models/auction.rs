// gavel/src/models/auction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::PaymentState;

/// Lifecycle status of an auction. Transitions are owned by the state
/// machine in `crate::machine`; nothing else writes this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
  Draft,
  PendingReview,
  Active,
  PendingSellerDecision,
  Ended,
  PendingFulfillment,
  Fulfilled,
  Voided,
}

impl AuctionStatus {
  /// Terminal states accept no further events.
  pub fn is_terminal(self) -> bool {
    matches!(self, AuctionStatus::Fulfilled | AuctionStatus::Voided)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerDecision {
  Accept,
  Void,
}

/// One auction row. All monetary fields are integer minor-currency units
/// (cents); floating point never touches money in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
  pub id: Uuid,
  pub seller_id: Uuid,
  // Opaque to the engine; carried for notification payloads only.
  pub title: String,
  pub description: String,
  pub category: String,
  pub start_price_cents: i64,
  pub reserve_price_cents: i64,
  /// Highest accepted bid amount; starts at `start_price_cents` and only
  /// ever increases.
  pub current_price_cents: i64,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  pub status: AuctionStatus,
  /// Projection of the authoritative `Payment` row, written only by the
  /// settlement coordinator.
  pub payment_status: Option<PaymentState>,
  pub winning_bidder_id: Option<Uuid>,
  pub seller_decision: Option<SellerDecision>,
  /// Flipped by the (external) moderation collaborator.
  pub approved: bool,
  pub payment_due_date: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Auction {
  /// Whether `now` falls inside the bidding window.
  pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
    self.start_date <= now && now <= self.end_date
  }

  /// Whether the recorded winning amount satisfies the reserve. The ledger
  /// only accepts strictly-greater amounts, so `current_price_cents` always
  /// equals the highest accepted bid once any bid exists.
  pub fn reserve_met(&self) -> bool {
    self.current_price_cents >= self.reserve_price_cents
  }
}

/// Seller-supplied fields for a new listing; everything else is derived.
#[derive(Debug, Clone)]
pub struct NewAuction {
  pub seller_id: Uuid,
  pub title: String,
  pub description: String,
  pub category: String,
  pub start_price_cents: i64,
  pub reserve_price_cents: i64,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
}
