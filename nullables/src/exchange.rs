//! Nullable exchange rates: one fixed multiplier for every pair.

use async_trait::async_trait;
use coffer_ledger_client::ExchangeRateConverter;
use coffer_types::{DecimalValue, Timestamp};
use std::sync::Mutex;

/// A converter that multiplies by a constant rate and records each request.
pub struct NullExchangeRates {
    rate: DecimalValue,
    requests: Mutex<Vec<(String, String, Timestamp, DecimalValue)>>,
}

impl NullExchangeRates {
    pub fn new(rate: DecimalValue) -> Self {
        Self {
            rate,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every conversion yields zero.
    pub fn zero() -> Self {
        Self::new(DecimalValue::ZERO)
    }

    /// Requests received so far, as `(from, to, timestamp, amount)`.
    pub fn requests(&self) -> Vec<(String, String, Timestamp, DecimalValue)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeRateConverter for NullExchangeRates {
    async fn exchange(
        &self,
        from: &str,
        to: &str,
        timestamp: Timestamp,
        amount: DecimalValue,
    ) -> DecimalValue {
        self.requests
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string(), timestamp, amount.clone()));
        amount * self.rate.clone()
    }
}
