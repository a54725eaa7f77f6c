use time::OffsetDateTime;

/// Cost per unit of consumption. Rows are append-only; the latest `set_at`
/// is the current rate.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tariff {
    pub id: i64,
    pub cost_per_unit: f64,
    pub set_at: OffsetDateTime,
}
