pub mod accounts;
pub mod analyzer;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod http;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod rounding;
pub mod sinks;
pub mod sources;
pub mod store;
pub mod transform;

pub use analyzer::CostAnalyzer;
pub use engine::ConsumptionEngine;
pub use error::TrackerError;
pub use pipeline::{Envelope, Pipeline};
