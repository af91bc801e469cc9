// gavel/src/machine.rs

//! The auction state machine, as a pure transition function over the
//! auction row. Callers (engine, scheduler, settlement coordinator)
//! persist the returned post-transition row with a single store write, so
//! a crash leaves the auction either fully pre- or fully post-transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{Auction, AuctionStatus, PaymentState, SellerDecision};

/// Events the state machine accepts. Closing events carry the computed
/// winner; payment events carry the reserve re-check outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionEvent {
  ModeratorApprove,
  ClosingNoBids,
  ClosingReserveMet { winner_id: Uuid },
  ClosingBelowReserve,
  SellerAccept { winner_id: Uuid },
  SellerVoid,
  PaymentCompleted,
  PaymentFailed { met_reserve: bool },
  FulfillmentSubmitted,
}

/// Payload-free mirror of `AuctionEvent`, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionEventKind {
  ModeratorApprove,
  ClosingNoBids,
  ClosingReserveMet,
  ClosingBelowReserve,
  SellerAccept,
  SellerVoid,
  PaymentCompleted,
  PaymentFailed,
  FulfillmentSubmitted,
}

impl AuctionEvent {
  pub fn kind(&self) -> AuctionEventKind {
    match self {
      AuctionEvent::ModeratorApprove => AuctionEventKind::ModeratorApprove,
      AuctionEvent::ClosingNoBids => AuctionEventKind::ClosingNoBids,
      AuctionEvent::ClosingReserveMet { .. } => AuctionEventKind::ClosingReserveMet,
      AuctionEvent::ClosingBelowReserve => AuctionEventKind::ClosingBelowReserve,
      AuctionEvent::SellerAccept { .. } => AuctionEventKind::SellerAccept,
      AuctionEvent::SellerVoid => AuctionEventKind::SellerVoid,
      AuctionEvent::PaymentCompleted => AuctionEventKind::PaymentCompleted,
      AuctionEvent::PaymentFailed { .. } => AuctionEventKind::PaymentFailed,
      AuctionEvent::FulfillmentSubmitted => AuctionEventKind::FulfillmentSubmitted,
    }
  }
}

fn illegal(auction: &Auction, event: &AuctionEvent) -> EngineError {
  EngineError::InvalidStateTransition {
    from: auction.status,
    event: event.kind(),
  }
}

/// Applies `event` to `auction`, returning the complete post-transition
/// row. Illegal pairs fail with `InvalidStateTransition` and are never
/// coerced; the input row is left untouched either way.
pub fn apply(auction: &Auction, event: &AuctionEvent, now: DateTime<Utc>) -> EngineResult<Auction> {
  // A second fulfillment attempt gets its own error rather than the
  // generic transition failure, so callers can surface it distinctly.
  if auction.status == AuctionStatus::Fulfilled && matches!(event, AuctionEvent::FulfillmentSubmitted) {
    return Err(EngineError::AlreadyFulfilled);
  }
  if auction.status.is_terminal() {
    return Err(illegal(auction, event));
  }

  let mut next = auction.clone();
  next.updated_at = now;

  match (auction.status, event) {
    (AuctionStatus::PendingReview, AuctionEvent::ModeratorApprove) => {
      if now > auction.end_date {
        return Err(EngineError::AuctionWindowClosed);
      }
      if now < auction.start_date {
        return Err(EngineError::Validation(
          "auction cannot activate before its start date".to_string(),
        ));
      }
      next.status = AuctionStatus::Active;
    }

    (AuctionStatus::Active, AuctionEvent::ClosingNoBids) => {
      guard_due(auction, now)?;
      next.status = AuctionStatus::Ended;
    }

    (AuctionStatus::Active, AuctionEvent::ClosingReserveMet { winner_id }) => {
      guard_due(auction, now)?;
      next.status = AuctionStatus::Ended;
      next.winning_bidder_id = Some(*winner_id);
    }

    (AuctionStatus::Active, AuctionEvent::ClosingBelowReserve) => {
      guard_due(auction, now)?;
      next.status = AuctionStatus::PendingSellerDecision;
    }

    (AuctionStatus::PendingSellerDecision, AuctionEvent::SellerAccept { winner_id }) => {
      next.status = AuctionStatus::Ended;
      next.winning_bidder_id = Some(*winner_id);
      next.seller_decision = Some(SellerDecision::Accept);
    }

    (AuctionStatus::PendingSellerDecision, AuctionEvent::SellerVoid) => {
      next.status = AuctionStatus::Voided;
      next.seller_decision = Some(SellerDecision::Void);
    }

    (AuctionStatus::Ended, AuctionEvent::PaymentCompleted) => {
      if auction.winning_bidder_id.is_none() {
        return Err(illegal(auction, event));
      }
      next.status = AuctionStatus::PendingFulfillment;
      next.payment_status = Some(PaymentState::Completed);
    }

    (AuctionStatus::Ended, AuctionEvent::PaymentFailed { met_reserve }) => {
      if auction.winning_bidder_id.is_none() {
        return Err(illegal(auction, event));
      }
      next.payment_status = Some(PaymentState::Failed);
      if *met_reserve {
        // Unpaid but the reserve was satisfied: stays Ended, terminal for
        // this engine; an out-of-band admin workflow decides next steps.
        next.status = AuctionStatus::Ended;
      } else {
        // An accepted below-reserve sale fell through; the seller gets to
        // re-decide.
        next.status = AuctionStatus::PendingSellerDecision;
        next.seller_decision = None;
      }
    }

    (AuctionStatus::PendingFulfillment, AuctionEvent::FulfillmentSubmitted) => {
      if auction.payment_status != Some(PaymentState::Completed) {
        return Err(EngineError::PaymentNotCompleted);
      }
      next.status = AuctionStatus::Fulfilled;
    }

    _ => return Err(illegal(auction, event)),
  }

  Ok(next)
}

fn guard_due(auction: &Auction, now: DateTime<Utc>) -> EngineResult<()> {
  if now <= auction.end_date {
    return Err(EngineError::Validation(format!(
      "auction {} is not due until {}",
      auction.id, auction.end_date
    )));
  }
  Ok(())
}
