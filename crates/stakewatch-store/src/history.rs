//! Day-bucketed historical aggregation.
//!
//! A staker is usually sampled many times within one day. To keep intra-day
//! resampling from inflating aggregates, every query runs in two levels: the
//! inner statement groups by staker and by day and takes the *last* locked
//! stake recorded for that staker on that day; the outer statement then sums
//! or counts those per-staker values per day. Days before the store started
//! filling up produce null buckets; those (and zero buckets) are omitted from
//! the returned series rather than zero-filled.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};
use stakewatch_types::{LockedStakeSeries, StakerCountSeries};

use crate::{Result, Series, StoreError, TimeSeriesStore, DB_NAME, MEASUREMENT};

/// Read-side client for dashboard history queries.
#[derive(Debug)]
pub struct HistoryClient<S> {
    store: Arc<S>,
}

// Derived `Clone` would demand `S: Clone`; only the handle is cloned.
impl<S> Clone for HistoryClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TimeSeriesStore> HistoryClient<S> {
    /// Create a history client over the given store handle.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Sum of each staker's last-known locked stake, per day, over the last
    /// `days` days (today included).
    ///
    /// Days with no data or a zero sum are absent from the result.
    pub async fn locked_stake_series(&self, days: u32) -> Result<LockedStakeSeries> {
        let (begin, end) = day_range(Utc::now(), days);
        let statement = locked_stake_query(begin, end);
        let series = self.store.query(DB_NAME, &statement).await?;

        let mut out = LockedStakeSeries::new();
        for (day, sum) in day_values(&series, "sum")? {
            if sum != 0.0 {
                out.insert(day, sum);
            }
        }
        Ok(out)
    }

    /// Count of stakers with a known locked stake, per day, over the last
    /// `days` days (today included).
    ///
    /// Days with no data are absent; no entry ever carries a zero count.
    pub async fn staker_count_series(&self, days: u32) -> Result<StakerCountSeries> {
        let (begin, end) = day_range(Utc::now(), days);
        let statement = staker_count_query(begin, end);
        let series = self.store.query(DB_NAME, &statement).await?;

        let mut out = StakerCountSeries::new();
        for (day, count) in day_values(&series, "count")? {
            if count > 0.0 {
                out.insert(day, count as u64);
            }
        }
        Ok(out)
    }
}

/// Compute the queried day range: `[today_midnight - (days-1)d, today_midnight + 1d)`.
///
/// `days` is clamped to at least one, so the range always covers today.
pub fn day_range(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let days = i64::from(days.max(1));
    (midnight - Duration::days(days - 1), midnight + Duration::days(1))
}

/// The two-level locked-stake aggregation statement.
pub fn locked_stake_query(begin: DateTime<Utc>, end_exclusive: DateTime<Utc>) -> String {
    format!(
        "SELECT SUM(locked_stake) FROM (\
         SELECT staker_address, LAST(locked_stake) AS locked_stake \
         FROM {MEASUREMENT} \
         WHERE time >= '{}' AND time < '{}' \
         GROUP BY staker_address, time(1d)\
         ) GROUP BY time(1d)",
        rfc3339(begin),
        rfc3339(end_exclusive),
    )
}

/// The two-level staker-count aggregation statement.
pub fn staker_count_query(begin: DateTime<Utc>, end_exclusive: DateTime<Utc>) -> String {
    format!(
        "SELECT COUNT(staker_address) FROM (\
         SELECT staker_address, LAST(locked_stake) \
         FROM {MEASUREMENT} \
         WHERE time >= '{}' AND time < '{}' \
         GROUP BY staker_address, time(1d)\
         ) GROUP BY time(1d)",
        rfc3339(begin),
        rfc3339(end_exclusive),
    )
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Extract `(day_start_epoch, value)` pairs from a query result, skipping
/// null buckets.
///
/// Timestamps arrive as epoch seconds because every read query requests
/// `epoch=s`.
fn day_values(series: &[Series], value_column: &str) -> Result<Vec<(i64, f64)>> {
    let mut pairs = Vec::new();
    for s in series {
        let value_idx = s
            .columns
            .iter()
            .position(|c| c == value_column)
            .ok_or_else(|| {
                StoreError::Malformed(format!("result misses column `{value_column}`"))
            })?;
        for row in &s.values {
            let Some(day) = row.first().and_then(|v| v.as_i64()) else {
                return Err(StoreError::Malformed("row misses epoch timestamp".to_string()));
            };
            // Null bucket: a day inside the range with no samples.
            let Some(value) = row.get(value_idx).and_then(|v| v.as_f64()) else {
                continue;
            };
            pairs.push((day, value));
        }
    }
    Ok(pairs)
}
