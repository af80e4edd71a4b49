use serde::{Deserialize, Serialize};

/// Namespace prefixed to every exported metric name.
pub const NAMESPACE: &str = "mikrotik";

/// Declared shape of one exported metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    label_names: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        label_names: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names,
        }
    }

    /// Descriptor for a device property, named `mikrotik_<subsystem>_<property>`.
    ///
    /// The property name doubles as the help text.
    pub fn for_property(subsystem: &str, property: &str, label_names: Vec<String>) -> Self {
        Self::new(
            fq_name(NAMESPACE, subsystem, &metric_name_cleanup(property)),
            property,
            label_names,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

/// Join the non-empty parts of a metric name with `_`.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Device property names use `-`, metric names cannot.
pub fn metric_name_cleanup(name: &str) -> String {
    name.replace('-', "_")
}
