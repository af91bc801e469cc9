// gavel/src/notify.rs

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{NotificationPayload, NotificationRecord};
use crate::services::Mailer;
use crate::store::Store;

/// Outcome of a dispatch attempt. `Skipped` means a record with the same
/// dedup key already existed, i.e. the side effect already ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
  Sent,
  Skipped,
}

/// Idempotent, at-most-once-per-event notification delivery.
///
/// The durable record is the source of truth: it is written first (atomic
/// check-and-insert on `(kind, reference, user_id)`), and only a fresh
/// insert reaches the mailer. Mailer failures are logged and swallowed;
/// at-least-once-record / best-effort-mailer is the contract.
pub struct NotificationDispatcher {
  store: Arc<dyn Store>,
  mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
  pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
    Self { store, mailer }
  }

  pub async fn notify(
    &self,
    user_id: Uuid,
    reference: impl Into<String>,
    payload: NotificationPayload,
    now: DateTime<Utc>,
  ) -> EngineResult<DispatchOutcome> {
    let reference = reference.into();
    let record = NotificationRecord {
      id: Uuid::new_v4(),
      kind: payload.kind(),
      reference: reference.clone(),
      user_id,
      created_at: now,
    };

    let inserted = self
      .store
      .insert_notification_if_absent(record)
      .await
      .map_err(EngineError::storage)?;

    if !inserted {
      debug!(?payload, %user_id, %reference, "Notification already recorded; skipping");
      return Ok(DispatchOutcome::Skipped);
    }

    // Best-effort handoff. The record above already guards re-delivery;
    // a mailer hiccup must not fail or roll back the caller's transition.
    if let Err(e) = self.mailer.send(user_id, &payload).await {
      warn!(error = %e, %user_id, %reference, "Mailer delivery failed; notification recorded anyway");
    }

    Ok(DispatchOutcome::Sent)
  }
}
