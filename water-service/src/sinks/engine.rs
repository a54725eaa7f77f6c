use std::sync::Arc;

use futures::StreamExt;
use water_client::WaterStore;

use crate::{
    engine::ConsumptionEngine,
    pipeline::{Envelope, ImportRow, PipelineError, Sink, SinkReport},
};

/// Feeds imported rows through the consumption engine one at a time, in
/// stream order, so every row gets the same validation and neighbor repair as
/// an interactive add.
pub struct EngineSink {
    store: Arc<dyn WaterStore>,
    engine: ConsumptionEngine,
}

impl EngineSink {
    pub fn new(store: Arc<dyn WaterStore>, engine: ConsumptionEngine) -> Self {
        Self { store, engine }
    }
}

#[async_trait::async_trait]
impl Sink<ImportRow> for EngineSink {
    async fn run<S>(&self, mut input: S) -> Result<SinkReport, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<ImportRow>, PipelineError>>
            + Send
            + Unpin
            + 'static,
    {
        let mut report = SinkReport::default();

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping import row");
                    report.rejected += 1;
                    continue;
                }
            };

            let row = &env.payload;
            match self
                .engine
                .add(self.store.as_ref(), row.owner_id, row.date, row.value)
                .await
            {
                Ok(_) => report.written += 1,
                Err(e) if e.is_input_error() => {
                    tracing::warn!(line = env.line, error = %e, "import row rejected by engine");
                    report.rejected += 1;
                }
                Err(e) => {
                    tracing::error!(line = env.line, error = %e, "import aborted");
                    return Err(PipelineError::Sink(e.to_string()));
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SpikeConfig, pipeline::Pipeline, transform::ReadingValidation};
    use std::pin::Pin;
    use time::macros::date;
    use water_client::MemoryStore;

    struct VecSource(Vec<Result<Envelope<ImportRow>, PipelineError>>);

    #[async_trait::async_trait]
    impl crate::pipeline::Source<ImportRow> for VecSource {
        async fn stream(
            &self,
        ) -> Pin<Box<dyn futures::Stream<Item = Result<Envelope<ImportRow>, PipelineError>> + Send>>
        {
            let items: Vec<_> = self
                .0
                .iter()
                .map(|item| match item {
                    Ok(env) => Ok(env.clone()),
                    Err(e) => Err(PipelineError::Source(e.to_string())),
                })
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    fn row(line: u64, date: time::Date, value: f64) -> Result<Envelope<ImportRow>, PipelineError> {
        Ok(Envelope {
            payload: ImportRow {
                owner_id: 1,
                date,
                value,
            },
            line,
        })
    }

    #[tokio::test]
    async fn import_counts_written_and_rejected_rows() {
        let store = Arc::new(MemoryStore::new());
        let engine = ConsumptionEngine::new(SpikeConfig::default());

        let pipeline: Pipeline<_, ImportRow, _> = Pipeline {
            source: VecSource(vec![
                row(2, date!(2024-01-01), 100.0),
                row(3, date!(2024-01-08), 130.0),
                // Decreasing meter value.
                row(4, date!(2024-01-09), 120.0),
                // Fails validation before reaching the engine.
                row(5, date!(2024-01-10), -5.0),
                Err(PipelineError::Source("line 6: invalid date".to_string())),
                row(7, date!(2024-01-05), 115.0),
            ]),
            transforms: vec![Arc::new(ReadingValidation)],
            sink: EngineSink::new(store.clone(), engine),
        };

        let report = pipeline.run().await.unwrap();
        assert_eq!(
            report,
            SinkReport {
                written: 3,
                rejected: 3
            }
        );

        let readings = store.list_readings(1).await.unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].consumption, Some(15.0));
    }
}
