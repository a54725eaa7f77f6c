use time::Date;

pub type UserId = i64;
pub type ReadingId = i64;

/// A dated meter value for one owner, with the consumption derived from its
/// chronological predecessor.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    pub id: ReadingId,
    pub owner_id: UserId,
    #[sqlx(rename = "reading_date")]
    pub date: Date,
    #[sqlx(rename = "reading_value")]
    pub value: f64,
    /// Nullable only for rows written before consumption was tracked.
    pub consumption: Option<f64>,
    pub is_spike: bool,
}

/// A reading that has passed engine validation but has no id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub owner_id: UserId,
    pub date: Date,
    pub value: f64,
    pub consumption: f64,
    pub is_spike: bool,
}

impl NewReading {
    pub fn with_id(self, id: ReadingId) -> Reading {
        Reading {
            id,
            owner_id: self.owner_id,
            date: self.date,
            value: self.value,
            consumption: Some(self.consumption),
            is_spike: self.is_spike,
        }
    }
}

/// Arithmetic mean of the non-null consumption values in `window`.
///
/// Returns `None` when no reading in the window carries a consumption value.
/// Both spike detection and wastage costing go through this function so they
/// always agree on what "recent average" means.
pub fn rolling_mean(window: &[Reading]) -> Option<f64> {
    let (sum, count) = window
        .iter()
        .filter_map(|r| r.consumption)
        .fold((0.0, 0usize), |(sum, count), c| (sum + c, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
