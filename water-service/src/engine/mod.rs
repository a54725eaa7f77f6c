//! Consumption engine.
//!
//! Consumption is always `value - predecessor.value`, so inserting or removing
//! a reading only ever invalidates the consumption of its chronological
//! successor. Both operations repair that one record inside the same
//! transaction as the insert/delete.

use time::{Date, OffsetDateTime};
use water_client::{
    domain::{rolling_mean, NewReading, Reading, ReadingId, UserId},
    store::{READING_OWNER_DATE_KEY, READING_OWNER_FK},
    WaterStore,
};

use crate::{config::SpikeConfig, error::TrackerError};

/// Whether `consumption` exceeds `threshold` times the mean of `window`.
///
/// A window with no consumption values, or a zero mean, never produces a spike.
pub fn is_spike(consumption: f64, window: &[Reading], threshold: f64) -> bool {
    match rolling_mean(window) {
        Some(mean) if mean > 0.0 => consumption > mean * threshold,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConsumptionEngine {
    spike: SpikeConfig,
}

impl ConsumptionEngine {
    pub fn new(spike: SpikeConfig) -> Self {
        Self { spike }
    }

    /// Record a meter reading dated no later than today (UTC).
    pub async fn add(
        &self,
        store: &dyn WaterStore,
        owner: UserId,
        date: Date,
        value: f64,
    ) -> Result<Reading, TrackerError> {
        let today = OffsetDateTime::now_utc().date();
        self.add_as_of(store, owner, date, value, today).await
    }

    pub async fn add_as_of(
        &self,
        store: &dyn WaterStore,
        owner: UserId,
        date: Date,
        value: f64,
        today: Date,
    ) -> Result<Reading, TrackerError> {
        match self.try_add(store, owner, date, value, today).await {
            Ok(reading) => {
                metrics::counter!("readings_added_total").increment(1);
                if reading.is_spike {
                    metrics::counter!("reading_spikes_detected_total").increment(1);
                }
                tracing::info!(
                    owner_id = owner,
                    reading_id = reading.id,
                    %date,
                    consumption = reading.consumption.unwrap_or_default(),
                    is_spike = reading.is_spike,
                    "reading added"
                );
                Ok(reading)
            }
            Err(e) => {
                metrics::counter!("readings_rejected_total", "reason" => e.reason()).increment(1);
                if e.is_input_error() {
                    tracing::info!(owner_id = owner, %date, error = %e, "reading rejected");
                } else {
                    tracing::error!(owner_id = owner, %date, error = %e, "failed to add reading");
                }
                Err(e)
            }
        }
    }

    async fn try_add(
        &self,
        store: &dyn WaterStore,
        owner: UserId,
        date: Date,
        value: f64,
        today: Date,
    ) -> Result<Reading, TrackerError> {
        if !value.is_finite() || value < 0.0 {
            return Err(TrackerError::InvalidValue(value));
        }

        let mut tx = store.begin(owner).await?;

        if tx.find_by_owner_and_date(owner, date).await?.is_some() {
            return Err(TrackerError::DuplicateDate(date));
        }

        if date > today {
            return Err(TrackerError::FutureDate(date));
        }

        let consumption = match tx.find_latest_before(owner, date).await? {
            Some(prev) if value < prev.value => {
                return Err(TrackerError::NonMonotonic {
                    value,
                    previous: prev.value,
                });
            }
            Some(prev) => value - prev.value,
            None => 0.0,
        };

        let window = tx.find_last_n(owner, date, self.spike.window).await?;
        let spike = is_spike(consumption, &window, self.spike.threshold);

        let reading = tx
            .insert(NewReading {
                owner_id: owner,
                date,
                value,
                consumption,
                is_spike: spike,
            })
            .await
            .map_err(|e| {
                if e.violates(READING_OWNER_DATE_KEY) {
                    TrackerError::DuplicateDate(date)
                } else if e.violates(READING_OWNER_FK) {
                    TrackerError::UnknownOwner(owner)
                } else {
                    e.into()
                }
            })?;

        if let Some(mut next) = tx.find_earliest_after(owner, date).await? {
            if next.value < value {
                // Dropping `tx` discards the staged insert.
                return Err(TrackerError::InvertedOrder {
                    value,
                    next: next.value,
                });
            }
            next.consumption = Some(next.value - value);
            tx.update(&next).await?;
        }

        tx.commit().await?;
        Ok(reading)
    }

    /// Remove a reading and repair its successor's consumption.
    ///
    /// Unknown ids and readings owned by someone else are ignored.
    pub async fn delete(
        &self,
        store: &dyn WaterStore,
        id: ReadingId,
        owner: UserId,
    ) -> Result<(), TrackerError> {
        let mut tx = store.begin(owner).await?;

        let Some(target) = tx.find_by_id(id).await?.filter(|r| r.owner_id == owner) else {
            tracing::debug!(owner_id = owner, reading_id = id, "delete of unknown reading ignored");
            return Ok(());
        };

        let prev = tx.find_latest_before(owner, target.date).await?;
        if let Some(mut next) = tx.find_earliest_after(owner, target.date).await? {
            next.consumption = Some(match &prev {
                Some(prev) => next.value - prev.value,
                None => 0.0,
            });
            tx.update(&next).await?;
        }

        tx.delete(target.id).await?;
        tx.commit().await?;

        metrics::counter!("readings_deleted_total").increment(1);
        tracing::info!(owner_id = owner, reading_id = id, date = %target.date, "reading deleted");
        Ok(())
    }
}
