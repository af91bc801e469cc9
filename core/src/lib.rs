// src/lib.rs

//! Gavel: an asynchronous auction lifecycle & settlement engine.
//!
//! Gavel owns the state machine that takes an auction from creation
//! through bidding, closing, reserve-price resolution, payment and
//! fulfillment, with:
//!  - Bid acceptance that stays correct under concurrent writers
//!    (per-auction compare-and-update with bounded retries).
//!  - A polling closing scheduler with deterministic winner selection.
//!  - Idempotent settlement driven by payment-gateway callbacks.
//!  - At-most-once notification dispatch backed by durable dedup records.
//!
//! Rendering, authentication, gateway wire formats and email bodies are
//! all external collaborators behind the traits in `services` and `store`.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod machine;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod services;
pub mod settlement;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::EngineConfig;
pub use crate::engine::AuctionEngine;
pub use crate::error::{EngineError, EngineResult};
pub use crate::ledger::BidLedger;
pub use crate::machine::{AuctionEvent, AuctionEventKind};
pub use crate::models::{
  Auction, AuctionStatus, Bid, NewAuction, NotificationKind, NotificationPayload, NotificationRecord, Payment,
  PaymentState, SellerDecision,
};
pub use crate::notify::{DispatchOutcome, NotificationDispatcher};
pub use crate::scheduler::{ClosingScheduler, SweepSummary};
pub use crate::services::{
  Mailer, MockMailer, MockPaymentGateway, MockPayoutService, PaymentGateway, PayoutService,
};
pub use crate::settlement::SettlementCoordinator;
pub use crate::store::{MemoryStore, Store, StoreResult};
