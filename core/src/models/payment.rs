// gavel/src/models/payment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
  Pending,
  Processing,
  Completed,
  Failed,
}

/// The authoritative settlement record, one per auction. Fee fields are
/// computed once at creation and never recomputed; `auction.payment_status`
/// is a projection of `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
  pub id: Uuid,
  pub auction_id: Uuid,
  pub buyer_id: Uuid,
  pub seller_id: Uuid,
  /// The winning bid amount.
  pub amount_cents: i64,
  pub platform_fee_cents: i64,
  pub insurance_fee_cents: i64,
  /// amount + platform fee + insurance fee; what the buyer is charged.
  pub total_charge_cents: i64,
  /// amount minus the seller-side fee; released on fulfillment.
  pub seller_payout_cents: i64,
  pub status: PaymentState,
  /// Opaque reference issued by the payment gateway; never parsed.
  pub gateway_ref: Option<String>,
  pub created_at: DateTime<Utc>,
}
