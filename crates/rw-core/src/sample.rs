use crate::descriptor::MetricDescriptor;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Counter,
    Gauge,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("metric {metric} expects {expected} label values, got {actual}")]
    LabelCountMismatch {
        metric: String,
        expected: usize,
        actual: usize,
    },
}

/// One observation of a metric with its label values resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    descriptor: Arc<MetricDescriptor>,
    kind: ValueKind,
    value: f64,
    label_values: Vec<String>,
}

impl Sample {
    pub fn new(
        descriptor: Arc<MetricDescriptor>,
        kind: ValueKind,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self, SampleError> {
        let expected = descriptor.label_names().len();
        if label_values.len() != expected {
            return Err(SampleError::LabelCountMismatch {
                metric: descriptor.name().to_string(),
                expected,
                actual: label_values.len(),
            });
        }

        Ok(Self {
            descriptor,
            kind,
            value,
            label_values,
        })
    }

    pub fn counter(
        descriptor: Arc<MetricDescriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self, SampleError> {
        Self::new(descriptor, ValueKind::Counter, value, label_values)
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Value of the label with the given name, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .label_names()
            .iter()
            .position(|n| n == name)
            .map(|i| self.label_values[i].as_str())
    }

    /// Label name/value pairs in declaration order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.descriptor
            .label_names()
            .iter()
            .map(String::as_str)
            .zip(self.label_values.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> Arc<MetricDescriptor> {
        Arc::new(MetricDescriptor::new(
            "mikrotik_test_bytes",
            "bytes",
            vec!["name".into(), "comment".into()],
        ))
    }

    #[test]
    fn test_counter_with_matching_labels() {
        let sample = Sample::counter(descriptor(), 12.0, vec!["r1".into(), "ssh".into()]).unwrap();
        assert_eq!(sample.kind(), ValueKind::Counter);
        assert_eq!(sample.value(), 12.0);
        assert_eq!(sample.label("comment"), Some("ssh"));
        assert_eq!(sample.label("chain"), None);
        assert_eq!(
            sample.labels().collect::<Vec<_>>(),
            vec![("name", "r1"), ("comment", "ssh")]
        );
    }

    #[test]
    fn test_label_count_mismatch() {
        let err = Sample::counter(descriptor(), 1.0, vec!["r1".into()]).unwrap_err();
        assert_eq!(
            err,
            SampleError::LabelCountMismatch {
                metric: "mikrotik_test_bytes".into(),
                expected: 2,
                actual: 1,
            }
        );
    }
}
