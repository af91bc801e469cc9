// gavel/src/ledger.rs

//! Bid acceptance. This is the engine's only hot concurrent path: the
//! price check and the bid write go through the store's conditional
//! `commit_bid` primitive, retried a bounded number of times, so two
//! concurrent bidders can never both succeed with the lower one lost.

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::bid::winning_bid;
use crate::models::{Auction, AuctionStatus, Bid, NotificationPayload};
use crate::notify::NotificationDispatcher;
use crate::store::Store;

/// Bounded optimistic retries for a lost compare-and-update race. Past
/// this, the caller gets `BidTooLow` with the latest price and can decide
/// to re-bid.
const MAX_COMMIT_RETRIES: usize = 4;

pub struct BidLedger {
  store: Arc<dyn Store>,
  dispatcher: Arc<NotificationDispatcher>,
  clock: Arc<dyn Clock>,
  config: Arc<EngineConfig>,
}

impl BidLedger {
  pub fn new(
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
  ) -> Self {
    Self {
      store,
      dispatcher,
      clock,
      config,
    }
  }

  /// Places a bid. On success the auction's current price equals the bid
  /// amount; on `BidTooLow` the error carries the price the caller must
  /// beat.
  #[instrument(skip(self), fields(%auction_id, %bidder_id, amount_cents))]
  pub async fn place_bid(
    &self,
    auction_id: Uuid,
    bidder_id: Uuid,
    amount_cents: i64,
    insurance_requested: bool,
  ) -> EngineResult<Bid> {
    if amount_cents <= 0 {
      return Err(EngineError::InvalidAmount);
    }

    for attempt in 0..MAX_COMMIT_RETRIES {
      let now = self.clock.now();
      let auction = self
        .store
        .get_auction(auction_id)
        .await
        .map_err(EngineError::storage)?
        .ok_or(EngineError::AuctionNotFound { auction_id })?;

      self.check_preconditions(&auction, bidder_id, amount_cents, now)?;

      // The leader we may have to send an outbid notice to. Read before
      // the commit; a concurrent overtake just means their own outbid
      // notice comes from the competing call.
      let bids = self
        .store
        .bids_for_auction(auction_id)
        .await
        .map_err(EngineError::storage)?;
      let previous_leader = winning_bid(&bids).map(|b| b.bidder_id);

      // Anti-snipe: a bid landing inside the grace window pushes the end
      // date out by the full window, re-arming the closing sweep.
      let new_end_date = if auction.end_date - now <= self.config.anti_snipe_window {
        Some(auction.end_date + self.config.anti_snipe_window)
      } else {
        None
      };

      let bid = Bid {
        id: Uuid::new_v4(),
        auction_id,
        bidder_id,
        amount_cents,
        insurance_requested,
        created_at: now,
      };

      let committed = self
        .store
        .commit_bid(&bid, auction.current_price_cents, new_end_date)
        .await
        .map_err(EngineError::storage)?;

      if committed {
        info!(
          bid_id = %bid.id,
          extended = new_end_date.is_some(),
          "Bid accepted; current price is now {} cents",
          amount_cents
        );
        self.emit_bid_notices(&auction, &bid, previous_leader).await;
        return Ok(bid);
      }

      warn!(attempt, "Bid commit lost a concurrent race; re-reading price");
    }

    // Retries exhausted: report against the freshest price we can see.
    let current_price_cents = self
      .store
      .get_auction(auction_id)
      .await
      .map_err(EngineError::storage)?
      .map(|a| a.current_price_cents)
      .unwrap_or(amount_cents);
    Err(EngineError::BidTooLow { current_price_cents })
  }

  fn check_preconditions(
    &self,
    auction: &Auction,
    bidder_id: Uuid,
    amount_cents: i64,
    now: chrono::DateTime<chrono::Utc>,
  ) -> EngineResult<()> {
    if auction.status != AuctionStatus::Active {
      return Err(EngineError::AuctionNotActive { status: auction.status });
    }
    if !auction.window_contains(now) {
      return Err(EngineError::AuctionWindowClosed);
    }
    if bidder_id == auction.seller_id {
      return Err(EngineError::SelfBiddingForbidden);
    }
    if amount_cents <= auction.current_price_cents {
      return Err(EngineError::BidTooLow {
        current_price_cents: auction.current_price_cents,
      });
    }
    Ok(())
  }

  /// Seller gets a new-bid notice; the displaced leader (when distinct
  /// from the new bidder) gets an outbid notice. Keyed by the bid id, so
  /// every accepted bid notifies. Failures here never undo the bid.
  async fn emit_bid_notices(&self, auction: &Auction, bid: &Bid, previous_leader: Option<Uuid>) {
    let now = self.clock.now();
    let reference = bid.id.to_string();

    if let Err(e) = self
      .dispatcher
      .notify(
        auction.seller_id,
        reference.clone(),
        NotificationPayload::NewBid {
          amount_cents: bid.amount_cents,
        },
        now,
      )
      .await
    {
      warn!(error = %e, "Failed to record new-bid notice");
    }

    if let Some(outbid_user) = previous_leader.filter(|leader| *leader != bid.bidder_id) {
      if let Err(e) = self
        .dispatcher
        .notify(
          outbid_user,
          reference,
          NotificationPayload::Outbid {
            auction_title: auction.title.clone(),
            amount_cents: bid.amount_cents,
          },
          now,
        )
        .await
      {
        warn!(error = %e, "Failed to record outbid notice");
      }
    }
  }
}
