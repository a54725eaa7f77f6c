//! Totals and averages over a user's reading history.

use serde::Serialize;
use water_client::{
    domain::{Reading, UserId},
    StoreError, WaterStore,
};

use crate::rounding::round2;

/// How many of the newest readings the dashboard shows.
pub const RECENT_READINGS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_consumption: f64,
    pub avg_daily: f64,
    pub reading_count: usize,
    /// Newest first.
    pub recent_readings: Vec<Reading>,
}

/// Summarize `readings`, which must be ordered newest first.
pub fn summarize(readings: &[Reading]) -> DashboardSummary {
    let total: f64 = readings.iter().filter_map(|r| r.consumption).sum();

    let avg_daily = match (readings.last(), readings.first()) {
        (Some(earliest), Some(latest)) if earliest.date == latest.date => total,
        (Some(earliest), Some(latest)) => {
            let days = (latest.date - earliest.date).whole_days();
            if days > 0 {
                total / days as f64
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    DashboardSummary {
        total_consumption: round2(total),
        avg_daily: round2(avg_daily),
        reading_count: readings.len(),
        recent_readings: readings
            .iter()
            .take(RECENT_READINGS)
            .cloned()
            .map(rounded)
            .collect(),
    }
}

/// `reading` with its consumption rounded for output.
pub fn rounded(mut reading: Reading) -> Reading {
    reading.consumption = reading.consumption.map(round2);
    reading
}

pub async fn dashboard(
    store: &dyn WaterStore,
    owner: UserId,
) -> Result<DashboardSummary, StoreError> {
    let readings = store.list_readings(owner).await?;
    Ok(summarize(&readings))
}

/// Full history, newest first.
pub async fn history(store: &dyn WaterStore, owner: UserId) -> Result<Vec<Reading>, StoreError> {
    let readings = store.list_readings(owner).await?;
    Ok(readings.into_iter().map(rounded).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, Date, Duration};

    fn reading(date: Date, consumption: Option<f64>) -> Reading {
        Reading {
            id: 0,
            owner_id: 1,
            date,
            value: 0.0,
            consumption,
            is_spike: false,
        }
    }

    #[test]
    fn recent_consumption_is_rounded() {
        let readings = vec![
            reading(date!(2024-01-08), Some(130.1 - 100.0)),
            reading(date!(2024-01-01), Some(0.0)),
        ];
        assert_ne!(readings[0].consumption, Some(30.1));

        let summary = summarize(&readings);
        assert_eq!(summary.total_consumption, 30.1);
        assert_eq!(summary.recent_readings[0].consumption, Some(30.1));
        assert_eq!(summary.recent_readings[1].consumption, Some(0.0));
    }

    #[tokio::test]
    async fn history_consumption_is_rounded() {
        let store = water_client::MemoryStore::new();
        let engine = crate::engine::ConsumptionEngine::new(crate::config::SpikeConfig::default());
        let today = date!(2024-01-31);
        engine.add_as_of(&store, 1, date!(2024-01-01), 100.0, today).await.unwrap();
        engine.add_as_of(&store, 1, date!(2024-01-08), 130.1, today).await.unwrap();

        let readings = history(&store, 1).await.unwrap();
        assert_eq!(readings[0].consumption, Some(30.1));
        assert_eq!(readings[1].consumption, Some(0.0));
    }

    #[test]
    fn empty_history_is_all_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_consumption, 0.0);
        assert_eq!(summary.avg_daily, 0.0);
        assert_eq!(summary.reading_count, 0);
        assert!(summary.recent_readings.is_empty());
    }

    #[test]
    fn single_day_average_is_the_total() {
        let summary = summarize(&[reading(date!(2024-01-01), Some(12.5))]);
        assert_eq!(summary.total_consumption, 12.5);
        assert_eq!(summary.avg_daily, 12.5);
    }

    #[test]
    fn average_spreads_total_over_the_date_span() {
        let readings = vec![
            reading(date!(2024-01-08), Some(30.0)),
            reading(date!(2024-01-05), None),
            reading(date!(2024-01-01), Some(0.0)),
        ];

        let summary = summarize(&readings);
        assert_eq!(summary.total_consumption, 30.0);
        // 30 over 7 days.
        assert_eq!(summary.avg_daily, 4.29);
        assert_eq!(summary.reading_count, 3);
    }

    #[test]
    fn recent_readings_are_capped() {
        let start = date!(2024-01-01);
        let mut readings: Vec<Reading> = (0..15)
            .map(|d| reading(start + Duration::days(d), Some(1.0)))
            .collect();
        readings.reverse();

        let summary = summarize(&readings);
        assert_eq!(summary.recent_readings.len(), RECENT_READINGS);
        assert_eq!(summary.recent_readings[0].date, date!(2024-01-15));
        assert_eq!(summary.reading_count, 15);
    }
}
