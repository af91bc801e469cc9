// gavel/src/settlement.rs

//! Settlement: payment windows, gateway callback handling, fulfillment and
//! payout. This module is the sole writer of payment state; everything it
//! does to an auction goes through the state machine and lands as one
//! store write.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::machine::{self, AuctionEvent};
use crate::models::{Auction, Bid, NotificationPayload, Payment, PaymentState};
use crate::notify::NotificationDispatcher;
use crate::services::{PaymentGateway, PayoutService};
use crate::store::Store;

/// Half-up integer rounding of a basis-point fee. Money never sees floats.
pub fn fee_cents(amount_cents: i64, rate_bps: u32) -> i64 {
  (amount_cents * rate_bps as i64 + 5_000) / 10_000
}

pub struct SettlementCoordinator {
  store: Arc<dyn Store>,
  dispatcher: Arc<NotificationDispatcher>,
  gateway: Arc<dyn PaymentGateway>,
  payout: Arc<dyn PayoutService>,
  clock: Arc<dyn Clock>,
  config: Arc<EngineConfig>,
}

impl SettlementCoordinator {
  pub fn new(
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
    gateway: Arc<dyn PaymentGateway>,
    payout: Arc<dyn PayoutService>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
  ) -> Self {
    Self {
      store,
      dispatcher,
      gateway,
      payout,
      clock,
      config,
    }
  }

  /// Opens the payment window for a freshly won auction: computes the fee
  /// breakdown once, persists the authoritative payment row and the
  /// auction projection, then initiates the gateway charge outside any
  /// lock. A gateway failure leaves the payment `Pending` for an external
  /// retry policy; the close itself is never rolled back.
  #[instrument(skip(self, auction, winning_bid), fields(auction_id = %auction.id))]
  pub async fn open_payment_window(&self, mut auction: Auction, winning_bid: &Bid) -> EngineResult<Auction> {
    let now = self.clock.now();
    let amount_cents = winning_bid.amount_cents;
    let platform_fee_cents = fee_cents(amount_cents, self.config.platform_fee_bps);
    let insurance_fee_cents = if winning_bid.insurance_requested {
      self.config.insurance_fee_cents
    } else {
      0
    };
    let total_charge_cents = amount_cents + platform_fee_cents + insurance_fee_cents;
    let seller_payout_cents = amount_cents - fee_cents(amount_cents, self.config.seller_fee_bps);

    let mut payment = Payment {
      id: Uuid::new_v4(),
      auction_id: auction.id,
      buyer_id: winning_bid.bidder_id,
      seller_id: auction.seller_id,
      amount_cents,
      platform_fee_cents,
      insurance_fee_cents,
      total_charge_cents,
      seller_payout_cents,
      status: PaymentState::Pending,
      gateway_ref: None,
      created_at: now,
    };

    auction.payment_status = Some(PaymentState::Pending);
    auction.payment_due_date = Some(now + self.config.payment_window);

    self
      .store
      .insert_payment(payment.clone())
      .await
      .map_err(EngineError::storage)?;
    self
      .store
      .update_auction(auction.clone())
      .await
      .map_err(EngineError::storage)?;

    info!(
      amount_cents,
      platform_fee_cents, insurance_fee_cents, total_charge_cents, seller_payout_cents, "Payment window opened"
    );

    // Gateway call happens after all store writes; no lock is held here.
    match self
      .gateway
      .initiate_charge(auction.id, total_charge_cents, winning_bid.bidder_id)
      .await
    {
      Ok(reference) => {
        payment.status = PaymentState::Processing;
        payment.gateway_ref = Some(reference);
        auction.payment_status = Some(PaymentState::Processing);
        self
          .store
          .update_payment(payment)
          .await
          .map_err(EngineError::storage)?;
        self
          .store
          .update_auction(auction.clone())
          .await
          .map_err(EngineError::storage)?;
      }
      Err(e) => {
        // Stays Pending; the (out-of-scope) retry policy picks it up.
        let err = EngineError::gateway(e);
        warn!(error = %err, "Charge initiation failed; payment left pending");
      }
    }

    Ok(auction)
  }

  /// Gateway callback: the charge settled. Idempotent — a repeat callback
  /// for an already-completed payment is a no-op.
  #[instrument(skip(self), fields(%auction_id))]
  pub async fn on_payment_completed(&self, auction_id: Uuid) -> EngineResult<()> {
    let now = self.clock.now();
    let auction = self.require_auction(auction_id).await?;
    let mut payment = self.require_payment(auction_id).await?;

    if payment.status == PaymentState::Completed {
      info!("Payment already completed; ignoring duplicate callback");
      return Ok(());
    }

    let next = machine::apply(&auction, &AuctionEvent::PaymentCompleted, now)?;

    payment.status = PaymentState::Completed;
    self
      .store
      .update_payment(payment.clone())
      .await
      .map_err(EngineError::storage)?;
    self
      .store
      .update_auction(next)
      .await
      .map_err(EngineError::storage)?;

    info!("Payment completed; auction awaiting fulfillment");

    let _ = self
      .dispatcher
      .notify(
        auction.seller_id,
        auction_id.to_string(),
        NotificationPayload::PaymentReceived {
          amount_cents: payment.amount_cents,
        },
        now,
      )
      .await
      .map_err(|e| warn!(error = %e, "Failed to record payment-received notice"));

    Ok(())
  }

  /// Gateway callback: the charge failed (or the payment window lapsed).
  /// The reserve is re-checked against the recorded winning amount: a sale
  /// that met the reserve stays `Ended` unpaid; an accepted below-reserve
  /// sale goes back to the seller for a fresh decision.
  #[instrument(skip(self), fields(%auction_id))]
  pub async fn on_payment_failed(&self, auction_id: Uuid) -> EngineResult<()> {
    let now = self.clock.now();
    let auction = self.require_auction(auction_id).await?;
    let mut payment = self.require_payment(auction_id).await?;

    if payment.status == PaymentState::Failed {
      info!("Payment already failed; ignoring duplicate callback");
      return Ok(());
    }

    let met_reserve = auction.reserve_met();
    let next = machine::apply(&auction, &AuctionEvent::PaymentFailed { met_reserve }, now)?;

    payment.status = PaymentState::Failed;
    self
      .store
      .update_payment(payment)
      .await
      .map_err(EngineError::storage)?;
    self
      .store
      .update_auction(next.clone())
      .await
      .map_err(EngineError::storage)?;

    info!(met_reserve, new_status = ?next.status, "Payment failed");

    let _ = self
      .dispatcher
      .notify(
        auction.seller_id,
        auction_id.to_string(),
        NotificationPayload::PaymentFailed,
        now,
      )
      .await
      .map_err(|e| warn!(error = %e, "Failed to record payment-failed notice"));

    Ok(())
  }

  /// Seller submitted tracking. Requires a completed payment; flips the
  /// auction to `Fulfilled`, releases the payout exactly once, and tells
  /// the buyer. A second submission fails with `AlreadyFulfilled` before
  /// any payout can repeat.
  #[instrument(skip(self, tracking_ref), fields(%auction_id, %caller))]
  pub async fn on_fulfillment_submitted(
    &self,
    auction_id: Uuid,
    caller: Uuid,
    tracking_ref: &str,
  ) -> EngineResult<Auction> {
    let now = self.clock.now();
    let auction = self.require_auction(auction_id).await?;

    if caller != auction.seller_id {
      return Err(EngineError::NotSeller);
    }

    let next = machine::apply(&auction, &AuctionEvent::FulfillmentSubmitted, now)?;
    let payment = self.require_payment(auction_id).await?;

    // Persist Fulfilled before the payout call: a crash between the two
    // leaves an unpaid-out fulfilled auction for reconciliation, never a
    // double payout.
    self
      .store
      .update_auction(next.clone())
      .await
      .map_err(EngineError::storage)?;

    if let Err(e) = self
      .payout
      .release_payout(auction.seller_id, payment.seller_payout_cents, payment.id)
      .await
    {
      error!(error = %e, payment_id = %payment.id, "Payout release failed; needs reconciliation");
    }

    if let Some(buyer_id) = next.winning_bidder_id {
      let _ = self
        .dispatcher
        .notify(
          buyer_id,
          auction_id.to_string(),
          NotificationPayload::FulfillmentSubmitted {
            tracking_ref: tracking_ref.to_string(),
          },
          now,
        )
        .await
        .map_err(|e| warn!(error = %e, "Failed to record fulfillment notice"));
    }

    info!("Auction fulfilled; payout released");
    Ok(next)
  }

  async fn require_auction(&self, auction_id: Uuid) -> EngineResult<Auction> {
    self
      .store
      .get_auction(auction_id)
      .await
      .map_err(EngineError::storage)?
      .ok_or(EngineError::AuctionNotFound { auction_id })
  }

  async fn require_payment(&self, auction_id: Uuid) -> EngineResult<Payment> {
    self
      .store
      .get_payment_by_auction(auction_id)
      .await
      .map_err(EngineError::storage)?
      .ok_or(EngineError::PaymentNotFound { auction_id })
  }
}
