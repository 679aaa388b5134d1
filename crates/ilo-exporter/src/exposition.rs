//! Prometheus text exposition of one scrape's samples.
//!
//! Every scrape gets a fresh [`Registry`], so nothing leaks between hosts or
//! between successive scrapes of the same host.

use ilo_common::{MetricKind, MetricSample};
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

#[derive(Debug, thiserror::Error)]
pub enum ExpositionError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("encoded metrics are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Renders `samples` in the Prometheus text format.
///
/// Samples sharing a name form one family, described by the first sample
/// seen. Samples that do not fit their family (different kind or label
/// names) and negative counter values are dropped with a warning.
pub fn encode(samples: &[MetricSample]) -> Result<String, ExpositionError> {
    let registry = Registry::new();
    let mut families: BTreeMap<&str, (MetricKind, Vec<&str>, Option<Family>)> = BTreeMap::new();

    for sample in samples {
        let (kind, label_names, family) = families.entry(sample.name()).or_insert_with(|| {
            let label_names = sample.label_names();
            let family = register(&registry, sample, &label_names);
            (sample.kind(), label_names, family)
        });

        let Some(family) = family else {
            continue;
        };
        if *kind != sample.kind() || *label_names != sample.label_names() {
            tracing::warn!(
                metric = %sample.name(),
                labels = ?sample.label_names(),
                "Sample does not match its metric family, dropped"
            );
            continue;
        }

        let values = sample.label_values();
        match family {
            Family::Gauge(vec) => vec.get_metric_with_label_values(&values)?.set(sample.value()),
            Family::Counter(vec) => {
                if sample.value() < 0.0 || sample.value().is_nan() {
                    tracing::warn!(metric = %sample.name(), value = sample.value(), "Negative counter value, dropped");
                    continue;
                }
                vec.get_metric_with_label_values(&values)?.inc_by(sample.value());
            }
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn register(registry: &Registry, sample: &MetricSample, label_names: &[&str]) -> Option<Family> {
    let opts = Opts::new(sample.name(), sample.help());
    let result = match sample.kind() {
        MetricKind::Gauge => GaugeVec::new(opts, label_names).and_then(|vec| {
            registry.register(Box::new(vec.clone()))?;
            Ok(Family::Gauge(vec))
        }),
        MetricKind::Counter => CounterVec::new(opts, label_names).and_then(|vec| {
            registry.register(Box::new(vec.clone()))?;
            Ok(Family::Counter(vec))
        }),
    };

    match result {
        Ok(family) => Some(family),
        Err(e) => {
            tracing::warn!(metric = %sample.name(), error = %e, "Failed to register metric family");
            None
        }
    }
}
