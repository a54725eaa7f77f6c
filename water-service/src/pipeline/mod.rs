//! Source -> transforms -> sink plumbing used by bulk reading imports.

use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};
use time::Date;
use water_client::domain::UserId;

/// One record in flight, tagged with where it came from for diagnostics.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    /// 1-based line in the source file, header included.
    pub line: u64,
}

/// A reading as it arrives from an import file, before engine validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub owner_id: UserId,
    pub date: Date,
    pub value: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

/// What a sink did with the records it was handed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub written: u64,
    pub rejected: u64,
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    /// Consume the stream. Per-record errors are counted as rejections; an
    /// `Err` return means the sink could not continue.
    async fn run<S>(&self, input: S) -> Result<SinkReport, PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>, // same-type transforms chain
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<SinkReport, PipelineError> {
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t = t.clone();
                async move {
                    match item {
                        Ok(env) => t.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}
