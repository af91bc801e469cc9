// gavel/src/engine.rs

//! `AuctionEngine` wires the components over one store and exposes the
//! seller/moderator-facing operations a thin API layer would call.

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::BidLedger;
use crate::machine::{self, AuctionEvent};
use crate::models::bid::winning_bid;
use crate::models::{Auction, AuctionStatus, Bid, NewAuction, NotificationPayload, SellerDecision};
use crate::notify::NotificationDispatcher;
use crate::scheduler::ClosingScheduler;
use crate::services::{Mailer, PaymentGateway, PayoutService};
use crate::settlement::SettlementCoordinator;
use crate::store::Store;

pub struct AuctionEngine {
  store: Arc<dyn Store>,
  config: Arc<EngineConfig>,
  clock: Arc<dyn Clock>,
  dispatcher: Arc<NotificationDispatcher>,
  ledger: BidLedger,
  settlement: Arc<SettlementCoordinator>,
  scheduler: Arc<ClosingScheduler>,
}

impl AuctionEngine {
  pub fn new(
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    payout: Arc<dyn PayoutService>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
  ) -> Self {
    let config = Arc::new(config);
    let dispatcher = Arc::new(NotificationDispatcher::new(Arc::clone(&store), mailer));
    let settlement = Arc::new(SettlementCoordinator::new(
      Arc::clone(&store),
      Arc::clone(&dispatcher),
      gateway,
      payout,
      Arc::clone(&clock),
      Arc::clone(&config),
    ));
    let ledger = BidLedger::new(
      Arc::clone(&store),
      Arc::clone(&dispatcher),
      Arc::clone(&clock),
      Arc::clone(&config),
    );
    let scheduler = Arc::new(ClosingScheduler::new(
      Arc::clone(&store),
      Arc::clone(&dispatcher),
      Arc::clone(&settlement),
      Arc::clone(&clock),
      Arc::clone(&config),
    ));

    Self {
      store,
      config,
      clock,
      dispatcher,
      ledger,
      settlement,
      scheduler,
    }
  }

  pub fn settlement(&self) -> &Arc<SettlementCoordinator> {
    &self.settlement
  }

  pub fn scheduler(&self) -> &Arc<ClosingScheduler> {
    &self.scheduler
  }

  pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
    &self.dispatcher
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Creates a draft listing after validating the pricing and window.
  #[instrument(skip(self, new), fields(seller_id = %new.seller_id))]
  pub async fn create_auction(&self, new: NewAuction) -> EngineResult<Auction> {
    if new.start_price_cents <= 0 {
      return Err(EngineError::InvalidAmount);
    }
    if new.reserve_price_cents < new.start_price_cents {
      return Err(EngineError::Validation(
        "reserve price cannot be below the start price".to_string(),
      ));
    }
    if new.end_date <= new.start_date {
      return Err(EngineError::Validation(
        "end date must be after the start date".to_string(),
      ));
    }

    let now = self.clock.now();
    let auction = Auction {
      id: Uuid::new_v4(),
      seller_id: new.seller_id,
      title: new.title,
      description: new.description,
      category: new.category,
      start_price_cents: new.start_price_cents,
      reserve_price_cents: new.reserve_price_cents,
      current_price_cents: new.start_price_cents,
      start_date: new.start_date,
      end_date: new.end_date,
      status: AuctionStatus::Draft,
      payment_status: None,
      winning_bidder_id: None,
      seller_decision: None,
      approved: false,
      payment_due_date: None,
      created_at: now,
      updated_at: now,
    };

    self
      .store
      .insert_auction(auction.clone())
      .await
      .map_err(EngineError::storage)?;
    info!(auction_id = %auction.id, "Auction created as draft");
    Ok(auction)
  }

  /// Seller hands the draft to moderation.
  pub async fn submit_for_review(&self, auction_id: Uuid, caller: Uuid) -> EngineResult<Auction> {
    let mut auction = self.require_auction(auction_id).await?;
    if caller != auction.seller_id {
      return Err(EngineError::NotSeller);
    }
    if auction.status != AuctionStatus::Draft {
      return Err(EngineError::Validation(format!(
        "only draft auctions can be submitted for review (status: {:?})",
        auction.status
      )));
    }
    auction.status = AuctionStatus::PendingReview;
    auction.updated_at = self.clock.now();
    self
      .store
      .update_auction(auction.clone())
      .await
      .map_err(EngineError::storage)?;
    Ok(auction)
  }

  /// Moderation approved the listing. Activates it when the bidding window
  /// is open; an early approval is recorded and a later call activates.
  #[instrument(skip(self), fields(%auction_id))]
  pub async fn moderator_approve(&self, auction_id: Uuid) -> EngineResult<Auction> {
    let now = self.clock.now();
    let mut auction = self.require_auction(auction_id).await?;

    if auction.status != AuctionStatus::PendingReview {
      return Err(EngineError::InvalidStateTransition {
        from: auction.status,
        event: AuctionEvent::ModeratorApprove.kind(),
      });
    }
    if now > auction.end_date {
      return Err(EngineError::AuctionWindowClosed);
    }

    auction.approved = true;
    if now < auction.start_date {
      // Approved ahead of the window; stays in review until the window
      // opens and approval is replayed.
      auction.updated_at = now;
      self
        .store
        .update_auction(auction.clone())
        .await
        .map_err(EngineError::storage)?;
      info!("Auction approved before its start date; activation deferred");
      return Ok(auction);
    }

    let next = machine::apply(&auction, &AuctionEvent::ModeratorApprove, now)?;
    self
      .store
      .update_auction(next.clone())
      .await
      .map_err(EngineError::storage)?;
    info!("Auction approved and active");
    Ok(next)
  }

  /// See `BidLedger::place_bid`.
  pub async fn place_bid(
    &self,
    auction_id: Uuid,
    bidder_id: Uuid,
    amount_cents: i64,
    insurance_requested: bool,
  ) -> EngineResult<Bid> {
    self
      .ledger
      .place_bid(auction_id, bidder_id, amount_cents, insurance_requested)
      .await
  }

  /// Records the seller's decision on a below-reserve close: accept the
  /// highest bid (opening a payment window) or void the sale.
  #[instrument(skip(self), fields(%auction_id, %caller, ?decision))]
  pub async fn seller_decide(&self, auction_id: Uuid, caller: Uuid, decision: SellerDecision) -> EngineResult<Auction> {
    let now = self.clock.now();
    let auction = self.require_auction(auction_id).await?;
    if caller != auction.seller_id {
      return Err(EngineError::NotSeller);
    }

    match decision {
      SellerDecision::Accept => {
        let bids = self
          .store
          .bids_for_auction(auction_id)
          .await
          .map_err(EngineError::storage)?;
        let winner = winning_bid(&bids)
          .cloned()
          .ok_or_else(|| EngineError::Validation("cannot accept a sale with no bids".to_string()))?;

        let next = machine::apply(
          &auction,
          &AuctionEvent::SellerAccept {
            winner_id: winner.bidder_id,
          },
          now,
        )?;
        let closed = self.settlement.open_payment_window(next, &winner).await?;
        info!(winner = %winner.bidder_id, "Seller accepted below-reserve sale");
        self.scheduler.notify_outcome(&closed, &bids, &winner).await;
        Ok(closed)
      }
      SellerDecision::Void => {
        let next = machine::apply(&auction, &AuctionEvent::SellerVoid, now)?;
        self
          .store
          .update_auction(next.clone())
          .await
          .map_err(EngineError::storage)?;
        info!("Seller voided below-reserve sale");

        let bids = self
          .store
          .bids_for_auction(auction_id)
          .await
          .map_err(EngineError::storage)?;
        let bidders: std::collections::BTreeSet<_> = bids.iter().map(|b| b.bidder_id).collect();
        for bidder in bidders {
          if let Err(e) = self
            .dispatcher
            .notify(bidder, auction_id.to_string(), NotificationPayload::AuctionVoided, now)
            .await
          {
            warn!(error = %e, %bidder, "Failed to record void notice");
          }
        }
        Ok(next)
      }
    }
  }

  /// See `SettlementCoordinator::on_fulfillment_submitted`.
  pub async fn submit_fulfillment(&self, auction_id: Uuid, caller: Uuid, tracking_ref: &str) -> EngineResult<Auction> {
    self
      .settlement
      .on_fulfillment_submitted(auction_id, caller, tracking_ref)
      .await
  }

  async fn require_auction(&self, auction_id: Uuid) -> EngineResult<Auction> {
    self
      .store
      .get_auction(auction_id)
      .await
      .map_err(EngineError::storage)?
      .ok_or(EngineError::AuctionNotFound { auction_id })
  }
}
