// gavel/src/models/mod.rs

//! Data structures for the durable auction, bid, payment and notification
//! records the engine coordinates through.

pub mod auction;
pub mod bid;
pub mod notification;
pub mod payment;

pub use auction::{Auction, AuctionStatus, NewAuction, SellerDecision};
pub use bid::Bid;
pub use notification::{NotificationKind, NotificationPayload, NotificationRecord};
pub use payment::{Payment, PaymentState};

// Event kinds live with the models so the error type can name them without
// pulling in the state machine module.
pub use crate::machine::AuctionEventKind;
