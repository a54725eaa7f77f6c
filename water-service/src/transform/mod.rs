use crate::pipeline::{Envelope, ImportRow, PipelineError, Transform};
use time::macros::date;

/// Pure validation of an imported reading.
///
/// Rules:
/// - value must be a finite, non-negative number.
/// - date must be within a broad sanity window [2000-01-01, 2100-01-01].
///
/// Chronological rules (monotonic values, no future dates) are the engine's job.
pub fn validate_import_row(env: Envelope<ImportRow>) -> Result<Envelope<ImportRow>, PipelineError> {
    let row = &env.payload;

    if !row.value.is_finite() || row.value < 0.0 {
        return Err(PipelineError::Transform(format!(
            "line {}: value must be non-negative",
            env.line
        )));
    }

    let min_date = date!(2000-01-01);
    let max_date = date!(2100-01-01);

    if row.date < min_date || row.date > max_date {
        return Err(PipelineError::Transform(format!(
            "line {}: date out of allowed range",
            env.line
        )));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<ImportRow, ImportRow> for ReadingValidation {
    async fn apply(&self, input: Envelope<ImportRow>) -> Result<Envelope<ImportRow>, PipelineError> {
        validate_import_row(input).inspect_err(|_| {
            metrics::counter!("import_rows_rejected_total", "stage" => "validation").increment(1);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, Date};

    fn env(date: Date, value: f64) -> Envelope<ImportRow> {
        Envelope {
            payload: ImportRow {
                owner_id: 1,
                date,
                value,
            },
            line: 2,
        }
    }

    #[test]
    fn accepts_valid_row() {
        assert!(validate_import_row(env(date!(2024-01-01), 100.0)).is_ok());
    }

    #[test]
    fn rejects_negative_value() {
        let res = validate_import_row(env(date!(2024-01-01), -0.1));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn rejects_out_of_range_date() {
        let res = validate_import_row(env(date!(1800-01-01), 1.0));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }
}
