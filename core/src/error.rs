// gavel/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::models::{AuctionEventKind, AuctionStatus};

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("Auction not found: {auction_id}")]
  AuctionNotFound { auction_id: uuid::Uuid },

  #[error("Payment record not found for auction: {auction_id}")]
  PaymentNotFound { auction_id: uuid::Uuid },

  #[error("Auction is not active (status: {status:?})")]
  AuctionNotActive { status: AuctionStatus },

  #[error("Auction bidding window is closed")]
  AuctionWindowClosed,

  #[error("Bid too low: amount must exceed the current price of {current_price_cents} cents")]
  BidTooLow { current_price_cents: i64 },

  #[error("Sellers may not bid on their own auctions")]
  SelfBiddingForbidden,

  #[error("Bid amount must be a positive number of minor currency units")]
  InvalidAmount,

  #[error("Caller is not the seller of this auction")]
  NotSeller,

  #[error("Illegal state transition: {from:?} cannot accept event {event:?}")]
  InvalidStateTransition {
    from: AuctionStatus,
    event: AuctionEventKind,
  },

  #[error("Fulfillment requires a completed payment")]
  PaymentNotCompleted,

  #[error("Auction has already been fulfilled")]
  AlreadyFulfilled,

  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Payment gateway failure. Source: {source}")]
  Gateway {
    #[source]
    source: AnyhowError,
  },

  #[error("Storage failure. Source: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },
}

impl EngineError {
  /// Wraps an opaque storage backend failure.
  pub fn storage(err: impl Into<AnyhowError>) -> Self {
    EngineError::Storage { source: err.into() }
  }

  pub fn gateway(err: impl Into<AnyhowError>) -> Self {
    EngineError::Gateway { source: err.into() }
  }
}

// Collaborators surfacing plain anyhow errors land in the Storage bucket;
// the chain stays inspectable via source().
impl From<AnyhowError> for EngineError {
  fn from(err: AnyhowError) -> Self {
    EngineError::Storage { source: err }
  }
}

pub type EngineResult<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wrapped_errors_keep_the_source_chain() {
    let err = EngineError::gateway(anyhow::anyhow!("card declined"));
    assert!(err.to_string().contains("card declined"));
    assert!(std::error::Error::source(&err).is_some());

    let err = EngineError::storage(anyhow::anyhow!("connection reset"));
    assert!(err.to_string().contains("connection reset"));
    assert!(std::error::Error::source(&err).is_some());
  }
}
