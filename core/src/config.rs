// gavel/src/config.rs

use chrono::Duration;
use std::env;

use crate::error::{EngineError, EngineResult};

/// Engine tuning knobs. Every rate and window the legacy system hardcoded
/// (inconsistently) is a named constant here; logic never embeds a literal.
///
/// Fee rates are integer basis points so money math stays in integers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Platform fee charged on top of the winning amount, in basis points.
  pub platform_fee_bps: u32,
  /// Seller-side fee deducted from the payout, in basis points.
  pub seller_fee_bps: u32,
  /// Flat shipping-insurance fee, applied iff the winning bid opted in.
  pub insurance_fee_cents: i64,
  /// How long the winner has to pay after the close.
  pub payment_window: Duration,
  /// A bid accepted within this window of `end_date` extends the auction
  /// by the same window (anti-sniping).
  pub anti_snipe_window: Duration,
  /// Lead time for the "ending soon" bidder notice.
  pub ending_soon_lead: Duration,
  /// Closing-sweep tick interval.
  pub sweep_interval: std::time::Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      platform_fee_bps: 500,
      seller_fee_bps: 1000,
      insurance_fee_cents: 1500,
      payment_window: Duration::hours(24),
      anti_snipe_window: Duration::minutes(5),
      ending_soon_lead: Duration::hours(1),
      sweep_interval: std::time::Duration::from_secs(60),
    }
  }
}

impl EngineConfig {
  pub fn from_env() -> EngineResult<Self> {
    let defaults = Self::default();

    let get_i64 = |var_name: &str, default: i64| -> EngineResult<i64> {
      match env::var(var_name) {
        Ok(raw) => raw
          .parse::<i64>()
          .map_err(|e| EngineError::Config(format!("Invalid {}: {}", var_name, e))),
        Err(_) => Ok(default),
      }
    };

    let platform_fee_bps = get_i64("PLATFORM_FEE_BPS", defaults.platform_fee_bps as i64)? as u32;
    let seller_fee_bps = get_i64("SELLER_FEE_BPS", defaults.seller_fee_bps as i64)? as u32;
    let insurance_fee_cents = get_i64("INSURANCE_FEE_CENTS", defaults.insurance_fee_cents)?;
    let payment_window = Duration::seconds(get_i64(
      "PAYMENT_WINDOW_SECS",
      defaults.payment_window.num_seconds(),
    )?);
    let anti_snipe_window = Duration::seconds(get_i64(
      "ANTI_SNIPE_WINDOW_SECS",
      defaults.anti_snipe_window.num_seconds(),
    )?);
    let ending_soon_lead = Duration::seconds(get_i64(
      "ENDING_SOON_LEAD_SECS",
      defaults.ending_soon_lead.num_seconds(),
    )?);
    let sweep_interval_secs = get_i64("SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs() as i64)?;

    if platform_fee_bps >= 10_000 || seller_fee_bps >= 10_000 {
      return Err(EngineError::Config(
        "Fee rates must be below 10000 basis points".to_string(),
      ));
    }
    if insurance_fee_cents < 0 {
      return Err(EngineError::Config(
        "INSURANCE_FEE_CENTS must be non-negative".to_string(),
      ));
    }
    if sweep_interval_secs <= 0 {
      return Err(EngineError::Config("SWEEP_INTERVAL_SECS must be positive".to_string()));
    }
    let sweep_interval = std::time::Duration::from_secs(sweep_interval_secs as u64);

    tracing::info!(
      platform_fee_bps,
      seller_fee_bps,
      insurance_fee_cents,
      "Engine configuration loaded"
    );

    Ok(Self {
      platform_fee_bps,
      seller_fee_bps,
      insurance_fee_cents,
      payment_window,
      anti_snipe_window,
      ending_soon_lead,
      sweep_interval,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  fn with_env<T>(var: &str, value: &str, f: impl FnOnce() -> T) -> T {
    std::env::set_var(var, value);
    let out = f();
    std::env::remove_var(var);
    out
  }

  #[test]
  #[serial]
  fn rejects_negative_insurance_fee() {
    let err = with_env("INSURANCE_FEE_CENTS", "-1", EngineConfig::from_env).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
  }

  #[test]
  #[serial]
  fn rejects_nonpositive_sweep_interval() {
    let err = with_env("SWEEP_INTERVAL_SECS", "-60", EngineConfig::from_env).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));

    let err = with_env("SWEEP_INTERVAL_SECS", "0", EngineConfig::from_env).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
  }

  #[test]
  #[serial]
  fn rejects_out_of_range_fee_rates() {
    let err = with_env("PLATFORM_FEE_BPS", "10000", EngineConfig::from_env).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
  }

  #[test]
  #[serial]
  fn unset_environment_yields_the_defaults() {
    let config = EngineConfig::from_env().expect("defaults");
    assert_eq!(config.platform_fee_bps, EngineConfig::default().platform_fee_bps);
    assert_eq!(config.sweep_interval, EngineConfig::default().sweep_interval);
  }
}
