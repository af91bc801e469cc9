// gavel/src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification kinds double as the first component of the dedup key
/// `(kind, reference, user_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  NewBid,
  Outbid,
  AuctionEndingSoon,
  AuctionWon,
  AuctionLost,
  AuctionEnded,
  ReserveNotMet,
  AuctionVoided,
  PaymentReceived,
  PaymentFailed,
  FulfillmentSubmitted,
}

/// One payload variant per notification kind, each carrying exactly the
/// fields its template needs. This replaces free-form payload maps; the
/// mailer receives the tagged value and renders it however it likes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
  NewBid { amount_cents: i64 },
  Outbid { auction_title: String, amount_cents: i64 },
  AuctionEndingSoon { ends_at: DateTime<Utc> },
  AuctionWon { amount_cents: i64, payment_due: DateTime<Utc> },
  AuctionLost,
  AuctionEnded { winning_amount_cents: Option<i64> },
  ReserveNotMet { highest_cents: i64, shortfall_cents: i64 },
  AuctionVoided,
  PaymentReceived { amount_cents: i64 },
  PaymentFailed,
  FulfillmentSubmitted { tracking_ref: String },
}

impl NotificationPayload {
  pub fn kind(&self) -> NotificationKind {
    match self {
      NotificationPayload::NewBid { .. } => NotificationKind::NewBid,
      NotificationPayload::Outbid { .. } => NotificationKind::Outbid,
      NotificationPayload::AuctionEndingSoon { .. } => NotificationKind::AuctionEndingSoon,
      NotificationPayload::AuctionWon { .. } => NotificationKind::AuctionWon,
      NotificationPayload::AuctionLost => NotificationKind::AuctionLost,
      NotificationPayload::AuctionEnded { .. } => NotificationKind::AuctionEnded,
      NotificationPayload::ReserveNotMet { .. } => NotificationKind::ReserveNotMet,
      NotificationPayload::AuctionVoided => NotificationKind::AuctionVoided,
      NotificationPayload::PaymentReceived { .. } => NotificationKind::PaymentReceived,
      NotificationPayload::PaymentFailed => NotificationKind::PaymentFailed,
      NotificationPayload::FulfillmentSubmitted { .. } => NotificationKind::FulfillmentSubmitted,
    }
  }
}

/// Durable dedup record. Existence of a row with a given
/// `(kind, reference, user_id)` means the associated side effect already
/// ran; the record survives process restarts, unlike any in-memory map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
  pub id: Uuid,
  pub kind: NotificationKind,
  /// Typically an auction id; for per-bid notices, the bid id.
  pub reference: String,
  pub user_id: Uuid,
  pub created_at: DateTime<Utc>,
}
