use anyhow::{Context, Result, bail};
use prometheus::core::Desc;
use prometheus::proto::{self, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};
use rw_core::{MetricDescriptor, Sample, ValueKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Turn descriptors into registry descriptors, rejecting invalid or
/// duplicated metric names.
pub fn register_descriptors(descriptors: &[Arc<MetricDescriptor>]) -> Result<Vec<Desc>> {
    let mut names = HashSet::new();
    let mut descs = Vec::with_capacity(descriptors.len());

    for d in descriptors {
        if !names.insert(d.name()) {
            bail!("metric {} is described more than once", d.name());
        }
        let desc = Desc::new(
            d.name().to_string(),
            d.help().to_string(),
            d.label_names().to_vec(),
            HashMap::new(),
        )
        .with_context(|| format!("invalid metric descriptor {}", d.name()))?;
        descs.push(desc);
    }

    Ok(descs)
}

/// Group samples into metric families, one per descriptor, in the order
/// descriptors first appear.
pub fn encode_samples(samples: &[Sample]) -> Vec<MetricFamily> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut families: Vec<MetricFamily> = Vec::new();

    for sample in samples {
        let desc = sample.descriptor();
        let i = *index.entry(desc.name()).or_insert_with(|| {
            let mut family = MetricFamily::default();
            family.set_name(desc.name().to_string());
            family.set_help(desc.help().to_string());
            family.set_field_type(metric_type(sample.kind()));
            families.push(family);
            families.len() - 1
        });
        families[i].mut_metric().push(to_metric(sample));
    }

    families
}

fn metric_type(kind: ValueKind) -> MetricType {
    match kind {
        ValueKind::Counter => MetricType::COUNTER,
        ValueKind::Gauge => MetricType::GAUGE,
    }
}

fn to_metric(sample: &Sample) -> Metric {
    let mut metric = Metric::default();
    for (name, value) in sample.labels() {
        let mut pair = LabelPair::default();
        pair.set_name(name.to_string());
        pair.set_value(value.to_string());
        metric.mut_label().push(pair);
    }

    match sample.kind() {
        ValueKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(sample.value());
            metric.set_counter(counter);
        }
        ValueKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(sample.value());
            metric.set_gauge(gauge);
        }
    }

    metric
}

/// Render metric families in Prometheus text format.
pub fn render_text(families: &[MetricFamily]) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
