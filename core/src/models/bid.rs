// gavel/src/models/bid.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One bid row. Immutable once committed; the ledger never updates or
/// deletes bids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
  pub id: Uuid,
  pub auction_id: Uuid,
  pub bidder_id: Uuid,
  pub amount_cents: i64,
  /// Buyer's shipping-insurance opt-in, captured at bid time. The winning
  /// bid's flag selects the flat insurance fee at settlement.
  pub insurance_requested: bool,
  pub created_at: DateTime<Utc>,
}

/// Winner ordering: highest amount first, ties broken by earliest
/// timestamp. Deterministic for any input order.
pub fn winning_bid(bids: &[Bid]) -> Option<&Bid> {
  bids
    .iter()
    .min_by(|a, b| b.amount_cents.cmp(&a.amount_cents).then(a.created_at.cmp(&b.created_at)))
}
