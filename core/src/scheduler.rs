// gavel/src/scheduler.rs

//! Periodic sweeps. Closing is polling-based on purpose: every tick re-derives
//! "is this auction due" from the store instead of keeping a timer per
//! auction, trading up-to-one-interval closing latency for zero in-memory
//! timer state. Re-running any sweep is a no-op for already-processed
//! auctions (status checks) and re-fires no notices (dispatcher dedup).

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::machine::{self, AuctionEvent};
use crate::models::bid::winning_bid;
use crate::models::{Auction, Bid, NotificationPayload};
use crate::notify::NotificationDispatcher;
use crate::settlement::SettlementCoordinator;
use crate::store::Store;

/// Per-sweep accounting, mostly for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
  pub processed: usize,
  pub failed: usize,
}

pub struct ClosingScheduler {
  store: Arc<dyn Store>,
  dispatcher: Arc<NotificationDispatcher>,
  settlement: Arc<SettlementCoordinator>,
  clock: Arc<dyn Clock>,
  config: Arc<EngineConfig>,
}

impl ClosingScheduler {
  pub fn new(
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
    settlement: Arc<SettlementCoordinator>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
  ) -> Self {
    Self {
      store,
      dispatcher,
      settlement,
      clock,
      config,
    }
  }

  /// Runs the sweep loop until the task is dropped. Embedders usually call
  /// `spawn` instead.
  pub async fn run(&self) {
    let mut ticker = tokio::time::interval(self.config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      self.tick().await;
    }
  }

  pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
    let this = Arc::clone(self);
    tokio::spawn(async move { this.run().await })
  }

  /// One full pass: ending-soon notices, due closings, lapsed payment
  /// windows. Each sub-sweep isolates per-auction failures.
  pub async fn tick(&self) {
    self.sweep_ending_soon().await;
    let summary = self.sweep_once().await;
    if summary.processed > 0 || summary.failed > 0 {
      info!(?summary, "Closing sweep finished");
    }
    self.sweep_payment_deadlines().await;
  }

  /// Closes every active auction whose end date has passed. One auction's
  /// failure is logged and never aborts the rest of the sweep.
  #[instrument(skip(self))]
  pub async fn sweep_once(&self) -> SweepSummary {
    let now = self.clock.now();
    let due = match self.store.list_due_auctions(now).await {
      Ok(due) => due,
      Err(e) => {
        error!(error = %e, "Failed to list due auctions; skipping sweep");
        return SweepSummary::default();
      }
    };

    let mut summary = SweepSummary::default();
    for auction in due {
      let auction_id = auction.id;
      match self.close_auction(auction).await {
        Ok(()) => summary.processed += 1,
        Err(e) => {
          summary.failed += 1;
          error!(%auction_id, error = %e, "Failed to close auction");
        }
      }
    }
    summary
  }

  async fn close_auction(&self, auction: Auction) -> EngineResult<()> {
    let now = self.clock.now();
    let bids = self
      .store
      .bids_for_auction(auction.id)
      .await
      .map_err(EngineError::storage)?;

    let Some(winner) = winning_bid(&bids).cloned() else {
      // No bids: ended, no winner, seller informed.
      let next = machine::apply(&auction, &AuctionEvent::ClosingNoBids, now)?;
      self
        .store
        .update_auction(next)
        .await
        .map_err(EngineError::storage)?;
      info!(auction_id = %auction.id, "Auction ended without bids");
      self
        .notify_quiet(
          auction.seller_id,
          auction.id.to_string(),
          NotificationPayload::AuctionEnded {
            winning_amount_cents: None,
          },
        )
        .await;
      return Ok(());
    };

    if winner.amount_cents >= auction.reserve_price_cents {
      let next = machine::apply(
        &auction,
        &AuctionEvent::ClosingReserveMet {
          winner_id: winner.bidder_id,
        },
        now,
      )?;
      // The settlement coordinator persists the closed row together with
      // the payment window it opens.
      let closed = self.settlement.open_payment_window(next, &winner).await?;
      info!(
        auction_id = %auction.id,
        winner = %winner.bidder_id,
        amount_cents = winner.amount_cents,
        "Auction closed with reserve met"
      );
      self.notify_outcome(&closed, &bids, &winner).await;
    } else {
      let next = machine::apply(&auction, &AuctionEvent::ClosingBelowReserve, now)?;
      self
        .store
        .update_auction(next)
        .await
        .map_err(EngineError::storage)?;
      let shortfall_cents = auction.reserve_price_cents - winner.amount_cents;
      info!(
        auction_id = %auction.id,
        highest_cents = winner.amount_cents,
        shortfall_cents,
        "Auction closed below reserve; awaiting seller decision"
      );
      self
        .notify_quiet(
          auction.seller_id,
          auction.id.to_string(),
          NotificationPayload::ReserveNotMet {
            highest_cents: winner.amount_cents,
            shortfall_cents,
          },
        )
        .await;
    }

    Ok(())
  }

  /// Win/lose notices to every distinct bidder plus the completion notice
  /// to the seller, all keyed by the auction id so a crashed-and-re-run
  /// sweep delivers nothing twice.
  pub(crate) async fn notify_outcome(&self, auction: &Auction, bids: &[Bid], winner: &Bid) {
    let reference = auction.id.to_string();

    let payment_due = auction.payment_due_date.unwrap_or(auction.end_date);
    self
      .notify_quiet(
        winner.bidder_id,
        reference.clone(),
        NotificationPayload::AuctionWon {
          amount_cents: winner.amount_cents,
          payment_due,
        },
      )
      .await;

    let losers: BTreeSet<_> = bids
      .iter()
      .map(|b| b.bidder_id)
      .filter(|bidder| *bidder != winner.bidder_id)
      .collect();
    for bidder in losers {
      self
        .notify_quiet(bidder, reference.clone(), NotificationPayload::AuctionLost)
        .await;
    }

    self
      .notify_quiet(
        auction.seller_id,
        reference,
        NotificationPayload::AuctionEnded {
          winning_amount_cents: Some(winner.amount_cents),
        },
      )
      .await;
  }

  /// "Ending soon" pass: current bidders of auctions inside the lead
  /// window get a single heads-up, deduped per auction and bidder.
  #[instrument(skip(self))]
  pub async fn sweep_ending_soon(&self) {
    let now = self.clock.now();
    let soon = match self.store.list_ending_soon(now, self.config.ending_soon_lead).await {
      Ok(soon) => soon,
      Err(e) => {
        error!(error = %e, "Failed to list ending-soon auctions");
        return;
      }
    };

    for auction in soon {
      let bids = match self.store.bids_for_auction(auction.id).await {
        Ok(bids) => bids,
        Err(e) => {
          warn!(auction_id = %auction.id, error = %e, "Failed to load bids for ending-soon notice");
          continue;
        }
      };
      let bidders: BTreeSet<_> = bids.iter().map(|b| b.bidder_id).collect();
      for bidder in bidders {
        self
          .notify_quiet(
            bidder,
            auction.id.to_string(),
            NotificationPayload::AuctionEndingSoon {
              ends_at: auction.end_date,
            },
          )
          .await;
      }
    }
  }

  /// The payment window is an advisory deadline; an unpaid auction past it
  /// is treated exactly like a failed-payment callback.
  #[instrument(skip(self))]
  pub async fn sweep_payment_deadlines(&self) {
    let now = self.clock.now();
    let overdue = match self.store.list_payment_overdue(now).await {
      Ok(overdue) => overdue,
      Err(e) => {
        error!(error = %e, "Failed to list overdue payments");
        return;
      }
    };

    for auction in overdue {
      info!(auction_id = %auction.id, "Payment window lapsed; failing payment");
      if let Err(e) = self.settlement.on_payment_failed(auction.id).await {
        error!(auction_id = %auction.id, error = %e, "Failed to lapse overdue payment");
      }
    }
  }

  async fn notify_quiet(&self, user_id: uuid::Uuid, reference: String, payload: NotificationPayload) {
    let now = self.clock.now();
    if let Err(e) = self.dispatcher.notify(user_id, reference, payload, now).await {
      warn!(error = %e, %user_id, "Failed to record sweep notice");
    }
  }
}
