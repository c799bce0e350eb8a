//! Exchange-rate conversion seam and an in-memory rate table.

use async_trait::async_trait;
use coffer_types::{DecimalValue, Timestamp};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// Converts an amount between currencies at a point in time.
#[async_trait]
pub trait ExchangeRateConverter: Send + Sync {
    /// Convert `amount` of `from` into `to` at the rate valid at `timestamp`.
    ///
    /// Returns zero when no rate is known for the pair.
    async fn exchange(
        &self,
        from: &str,
        to: &str,
        timestamp: Timestamp,
        amount: DecimalValue,
    ) -> DecimalValue;
}

type Pair = (String, String);

/// Historical rates keyed by currency pair and UTC day.
///
/// A lookup uses the rate of the requested day, else the closest earlier
/// day, else the pair's fallback rate.
#[derive(Default)]
pub struct RateTable {
    daily: RwLock<HashMap<Pair, BTreeMap<Timestamp, DecimalValue>>>,
    fallback: RwLock<HashMap<Pair, DecimalValue>>,
}

fn pair(from: &str, to: &str) -> Pair {
    (from.to_ascii_uppercase(), to.to_ascii_uppercase())
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the rate for the UTC day containing `day`.
    pub fn set_rate(&self, from: &str, to: &str, day: Timestamp, rate: DecimalValue) {
        self.daily
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(pair(from, to))
            .or_default()
            .insert(day.start_of_day(), rate);
    }

    /// Rate used when no daily rate on or before the requested day exists.
    pub fn set_fallback_rate(&self, from: &str, to: &str, rate: DecimalValue) {
        self.fallback
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pair(from, to), rate);
    }

    pub fn rate(&self, from: &str, to: &str, timestamp: Timestamp) -> Option<DecimalValue> {
        let key = pair(from, to);
        if key.0 == key.1 {
            return Some(DecimalValue::from(1u64));
        }
        let daily = self.daily.read().unwrap_or_else(PoisonError::into_inner);
        let historical = daily
            .get(&key)
            .and_then(|days| days.range(..=timestamp.start_of_day()).next_back())
            .map(|(_, rate)| rate.clone());
        historical.or_else(|| {
            self.fallback
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .cloned()
        })
    }
}

#[async_trait]
impl ExchangeRateConverter for RateTable {
    async fn exchange(
        &self,
        from: &str,
        to: &str,
        timestamp: Timestamp,
        amount: DecimalValue,
    ) -> DecimalValue {
        match self.rate(from, to, timestamp) {
            Some(rate) => amount * rate,
            None => {
                tracing::debug!(from, to, %timestamp, "no exchange rate known");
                DecimalValue::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_types::time::SECS_PER_DAY;

    fn dv(s: &str) -> DecimalValue {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn uses_rate_of_the_day() {
        let table = RateTable::new();
        table.set_rate("DARK", "USD", Timestamp::new(SECS_PER_DAY * 10), dv("0.5"));
        table.set_rate("DARK", "USD", Timestamp::new(SECS_PER_DAY * 11), dv("0.75"));

        let at = Timestamp::new(SECS_PER_DAY * 11 + 300);
        assert_eq!(table.exchange("DARK", "USD", at, dv("4")).await, dv("3"));
    }

    #[tokio::test]
    async fn falls_back_to_earlier_day_then_default() {
        let table = RateTable::new();
        table.set_rate("DARK", "USD", Timestamp::new(SECS_PER_DAY * 10), dv("0.5"));
        table.set_fallback_rate("dark", "usd", dv("2"));

        let later = Timestamp::new(SECS_PER_DAY * 20);
        assert_eq!(table.exchange("DARK", "USD", later, dv("2")).await, dv("1"));

        let earlier = Timestamp::new(SECS_PER_DAY * 2);
        assert_eq!(table.exchange("DARK", "USD", earlier, dv("2")).await, dv("4"));
    }

    #[tokio::test]
    async fn unknown_pair_is_zero() {
        let table = RateTable::new();
        let v = table.exchange("DARK", "EUR", Timestamp::new(1), dv("10")).await;
        assert!(v.is_zero());
    }

    #[tokio::test]
    async fn same_currency_is_identity() {
        let table = RateTable::new();
        assert_eq!(table.exchange("usd", "USD", Timestamp::new(1), dv("7")).await, dv("7"));
    }
}
