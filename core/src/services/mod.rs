// gavel/src/services/mod.rs

//! External collaborator seams: payment gateway, payout service, mailer.
//! The engine only ever sees these traits; the mock implementations here
//! simulate latency and failure the same way a wired-up integration would.

pub mod gateway;
pub mod mailer;
pub mod payout;

pub use gateway::{MockPaymentGateway, PaymentGateway};
pub use mailer::{Mailer, MockMailer};
pub use payout::{MockPayoutService, PayoutService};
