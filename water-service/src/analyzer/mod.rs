//! Cost analysis over a user's reading history and the current tariff.

use serde::Serialize;
use time::{Date, OffsetDateTime};
use water_client::{
    domain::{rolling_mean, Reading, ReadingId, Tariff, UserId},
    WaterStore,
};

use crate::{error::TrackerError, rounding::round2};

/// Consumption below this is classified as too low.
pub const LOW_CONSUMPTION_LIMIT: f64 = 120.0;
/// Consumption above this is classified as too high.
pub const HIGH_CONSUMPTION_LIMIT: f64 = 140.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConsumptionCategory {
    #[serde(rename = "Too low consumption")]
    TooLow,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Too much consumption")]
    TooMuch,
    #[serde(rename = "N/A")]
    Unknown,
}

impl ConsumptionCategory {
    pub fn classify(consumption: Option<f64>) -> Self {
        match consumption {
            None => Self::Unknown,
            Some(c) if c < LOW_CONSUMPTION_LIMIT => Self::TooLow,
            Some(c) if c <= HIGH_CONSUMPTION_LIMIT => Self::Average,
            Some(_) => Self::TooMuch,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TooLow => "Too low consumption",
            Self::Average => "Average",
            Self::TooMuch => "Too much consumption",
            Self::Unknown => "N/A",
        }
    }
}

impl std::fmt::Display for ConsumptionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingCost {
    pub id: ReadingId,
    pub date: Date,
    pub value: f64,
    pub consumption: Option<f64>,
    pub is_spike: bool,
    pub daily_cost: f64,
    pub wastage_cost: f64,
    pub category: ConsumptionCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAnalysis {
    pub current_tariff: f64,
    pub total_monthly_cost: f64,
    /// Newest first.
    pub breakdown: Vec<ReadingCost>,
}

/// Walks reading histories with the same window the engine uses for spike
/// detection, so wastage is measured against the baseline that flagged it.
#[derive(Debug, Clone, Copy)]
pub struct CostAnalyzer {
    window: usize,
}

impl CostAnalyzer {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub async fn analyze(
        &self,
        store: &dyn WaterStore,
        owner: UserId,
    ) -> Result<CostAnalysis, TrackerError> {
        let today = OffsetDateTime::now_utc().date();
        self.analyze_as_of(store, owner, today).await
    }

    pub async fn analyze_as_of(
        &self,
        store: &dyn WaterStore,
        owner: UserId,
        today: Date,
    ) -> Result<CostAnalysis, TrackerError> {
        let tariff = store
            .current_tariff()
            .await?
            .map(|t| t.cost_per_unit)
            .unwrap_or(0.0);
        let readings = store.list_readings(owner).await?;

        tracing::debug!(owner_id = owner, readings = readings.len(), tariff, "analyzing cost");
        Ok(self.breakdown(&readings, tariff, today))
    }

    /// Cost breakdown for `readings`, which must be ordered newest first.
    pub fn breakdown(&self, readings: &[Reading], tariff: f64, today: Date) -> CostAnalysis {
        let mut total_monthly_cost = 0.0;
        let mut breakdown = Vec::with_capacity(readings.len());

        for (i, reading) in readings.iter().enumerate() {
            let consumption = reading.consumption.unwrap_or(0.0);
            let daily_cost = consumption * tariff;

            let wastage_cost = if reading.is_spike {
                let end = readings.len().min(i + 1 + self.window);
                wastage(consumption, &readings[i + 1..end], tariff)
            } else {
                0.0
            };

            if reading.date.year() == today.year() && reading.date.month() == today.month() {
                total_monthly_cost += daily_cost;
            }

            breakdown.push(ReadingCost {
                id: reading.id,
                date: reading.date,
                value: reading.value,
                consumption: reading.consumption.map(round2),
                is_spike: reading.is_spike,
                daily_cost: round2(daily_cost),
                wastage_cost: round2(wastage_cost),
                category: ConsumptionCategory::classify(reading.consumption),
            });
        }

        CostAnalysis {
            current_tariff: tariff,
            total_monthly_cost: round2(total_monthly_cost),
            breakdown,
        }
    }

    /// Append a new tariff; it applies to every later analysis.
    pub async fn set_tariff(
        &self,
        store: &dyn WaterStore,
        cost: f64,
    ) -> Result<Tariff, TrackerError> {
        if !cost.is_finite() || cost < 0.0 {
            metrics::counter!("tariff_rejected_total").increment(1);
            return Err(TrackerError::InvalidCost(cost));
        }

        let tariff = store.insert_tariff(cost, OffsetDateTime::now_utc()).await?;

        metrics::counter!("tariff_updates_total").increment(1);
        tracing::info!(tariff_id = tariff.id, cost_per_unit = cost, "tariff updated");
        Ok(tariff)
    }
}

/// Cost of the excess over the baseline average, or 0 without an excess.
fn wastage(consumption: f64, baseline: &[Reading], tariff: f64) -> f64 {
    match rolling_mean(baseline) {
        Some(mean) if consumption - mean > 0.0 => (consumption - mean) * tariff,
        _ => 0.0,
    }
}
