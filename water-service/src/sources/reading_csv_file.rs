use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use futures::Stream;
use time::{macros::format_description, Date};
use water_client::domain::UserId;

use crate::pipeline::{Envelope, ImportRow, PipelineError, Source};

/// CSV import source for readings.
///
/// Expected header columns (by name):
/// - date (YYYY-MM-DD)
/// - value
/// - owner_id (optional when a default owner is given)
///
/// Malformed rows are yielded as errors and reading continues with the next row.
pub struct ReadingCsvFileSource {
    path: PathBuf,
    default_owner: Option<UserId>,
}

impl ReadingCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P, default_owner: Option<UserId>) -> Self {
        Self {
            path: path.into(),
            default_owner,
        }
    }
}

fn record_to_row(
    record: &StringRecord,
    headers: &StringRecord,
    default_owner: Option<UserId>,
) -> Result<ImportRow, PipelineError> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let get = |name: &str| -> Option<&str> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .filter(|v| !v.is_empty())
    };
    let missing = |name: &str| PipelineError::Source(format!("line {line}: missing column '{name}'"));

    let date_str = get("date").ok_or_else(|| missing("date"))?;
    let date = Date::parse(date_str, format_description!("[year]-[month]-[day]"))
        .map_err(|e| PipelineError::Source(format!("line {line}: invalid date '{date_str}': {e}")))?;

    let value_str = get("value").ok_or_else(|| missing("value"))?;
    let value = value_str
        .parse::<f64>()
        .map_err(|e| PipelineError::Source(format!("line {line}: invalid value '{value_str}': {e}")))?;

    let owner_id = match get("owner_id") {
        Some(raw) => raw
            .parse::<UserId>()
            .map_err(|e| PipelineError::Source(format!("line {line}: invalid owner_id '{raw}': {e}")))?,
        None => default_owner.ok_or_else(|| missing("owner_id"))?,
    };

    Ok(ImportRow {
        owner_id,
        date,
        value,
    })
}

fn open_reader(path: &PathBuf) -> Result<(csv::Reader<File>, StringRecord), PipelineError> {
    let file = File::open(path)
        .map_err(|e| PipelineError::Source(format!("failed to open CSV file: {e}")))?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
        .clone();
    Ok((rdr, headers))
}

#[async_trait::async_trait]
impl Source<ImportRow> for ReadingCsvFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<ImportRow>, PipelineError>> + Send>> {
        // Blocking reads; import files are small and this runs in a one-shot binary.
        let path = self.path.clone();
        let default_owner = self.default_owner;

        let s = async_stream::stream! {
            match open_reader(&path) {
                Err(e) => yield Err(e),
                Ok((mut rdr, headers)) => {
                    for result in rdr.records() {
                        let record = match result {
                            Ok(record) => record,
                            Err(e) => {
                                yield Err(PipelineError::Source(format!("failed to read CSV record: {e}")));
                                continue;
                            }
                        };

                        let line = record.position().map(|p| p.line()).unwrap_or_default();
                        match record_to_row(&record, &headers, default_owner) {
                            Ok(row) => yield Ok(Envelope { payload: row, line }),
                            Err(e) => {
                                metrics::counter!("import_rows_rejected_total", "stage" => "parse").increment(1);
                                yield Err(e);
                            }
                        }
                    }
                }
            }
        };

        Box::pin(s)
    }
}
