pub mod types;

pub use types::{MetricDesc, MetricKind, MetricSample, SampleError};
