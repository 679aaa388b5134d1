/// Prefix shared by every metric the exporter emits.
pub const PREFIX: &str = "ilo_";

/// Name of the label every sample carries first.
pub const HOST_LABEL: &str = "host";

/// Prometheus value type of a sample.
///
/// # Examples
///
/// ```
/// use ilo_common::types::MetricKind;
///
/// assert_eq!(MetricKind::Gauge.to_string(), "gauge");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SampleError {
    /// The number of label values does not match the descriptor's label names.
    #[error("metric {name}: expected {expected} label values, got {got}")]
    LabelCardinality {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// Static description of a metric: name, help text, kind and label names.
#[derive(Debug, Clone, Copy)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

impl MetricDesc {
    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            labels,
        }
    }

    pub const fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
            labels,
        }
    }

    /// Builds a sample of this metric, pairing `label_values` with the
    /// descriptor's label names in order.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::LabelCardinality`] when the number of values
    /// differs from the number of label names.
    ///
    /// # Examples
    ///
    /// ```
    /// use ilo_common::types::MetricDesc;
    ///
    /// const FAN: MetricDesc = MetricDesc::gauge("ilo_fan", "Fan speed", &["host", "name"]);
    ///
    /// let sample = FAN.sample(42.0, &["10.0.0.1", "Fan 1"]).unwrap();
    /// assert_eq!(sample.label("name"), Some("Fan 1"));
    /// assert!(FAN.sample(1.0, &["10.0.0.1"]).is_err());
    /// ```
    pub fn sample(&self, value: f64, label_values: &[&str]) -> Result<MetricSample, SampleError> {
        if label_values.len() != self.labels.len() {
            return Err(SampleError::LabelCardinality {
                name: self.name.to_string(),
                expected: self.labels.len(),
                got: label_values.len(),
            });
        }

        let labels = self
            .labels
            .iter()
            .zip(label_values)
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        Ok(MetricSample::new(self.name, self.help, self.kind, value, labels))
    }
}

/// One immutable metric value with its ordered label pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    name: String,
    help: String,
    kind: MetricKind,
    labels: Vec<(String, String)>,
    value: f64,
}

impl MetricSample {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        value: f64,
        labels: Vec<(String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            labels,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// Value of the label `key`, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn label_values(&self) -> Vec<&str> {
        self.labels.iter().map(|(_, v)| v.as_str()).collect()
    }

    /// The host this sample was collected for.
    pub fn host(&self) -> Option<&str> {
        self.label(HOST_LABEL)
    }
}

/// Maps a boolean condition to a gauge value.
pub fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PSU: MetricDesc = MetricDesc::gauge(
        "ilo_power_supply_healthy",
        "Health status of the power supply",
        &["host", "serial"],
    );

    #[test]
    fn sample_keeps_label_order() {
        let sample = PSU.sample(1.0, &["ilo1", "5WBXK0B"]).unwrap();
        assert_eq!(sample.label_names(), vec!["host", "serial"]);
        assert_eq!(sample.label_values(), vec!["ilo1", "5WBXK0B"]);
        assert_eq!(sample.host(), Some("ilo1"));
        assert_eq!(sample.kind(), MetricKind::Gauge);
    }

    #[test]
    fn sample_rejects_wrong_label_count() {
        let err = PSU.sample(1.0, &["ilo1", "a", "b"]).unwrap_err();
        assert_eq!(
            err,
            SampleError::LabelCardinality {
                name: "ilo_power_supply_healthy".to_string(),
                expected: 2,
                got: 3,
            }
        );
    }

    #[test]
    fn missing_label_is_none() {
        let sample = PSU.sample(0.0, &["ilo1", "x"]).unwrap();
        assert_eq!(sample.label("name"), None);
    }

    #[test]
    fn bool_value_maps_to_gauge() {
        assert_eq!(bool_value(true), 1.0);
        assert_eq!(bool_value(false), 0.0);
    }
}
