use crate::context::{CollectorContext, DeviceClient};
use rw_core::{
    COMMENT_FIELD, CollectError, DeviceIdentity, MetricDescriptor, PropertySet, Row, Sample,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error};

pub const FIREWALL_FILTER_COMMAND: &str = "/ip/firewall/filter/print";
pub const FIREWALL_RULE_SUBSYSTEM: &str = "firewall_rule";

/// Labels every sample carries before the identity fields.
const DEVICE_LABELS: [&str; 2] = ["name", "address"];

/// Metric descriptors keyed by the device property they export.
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    entries: Vec<(String, Arc<MetricDescriptor>)>,
}

impl DescriptorTable {
    fn build(subsystem: &str, props: &PropertySet) -> Self {
        let label_names: Vec<String> = DEVICE_LABELS
            .iter()
            .map(|l| l.to_string())
            .chain(props.identity_fields().iter().cloned())
            .collect();

        let entries = props
            .metric_fields()
            .iter()
            .map(|p| {
                let desc = MetricDescriptor::for_property(subsystem, p, label_names.clone());
                (p.clone(), Arc::new(desc))
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, property: &str) -> Option<&Arc<MetricDescriptor>> {
        self.entries
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<MetricDescriptor>)> {
        self.entries.iter().map(|(p, d)| (p.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts from one successful poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub rows: usize,
    pub retained: usize,
    pub samples: usize,
    pub errors: usize,
}

/// Projects firewall rule counters into labeled counter samples.
///
/// Holds nothing but its descriptor table, so one instance can serve
/// concurrent polls of many devices.
#[derive(Debug, Clone)]
pub struct StatProjector {
    command: String,
    props: PropertySet,
    descriptors: DescriptorTable,
}

impl StatProjector {
    pub fn new(props: PropertySet) -> Self {
        let descriptors = DescriptorTable::build(FIREWALL_RULE_SUBSYSTEM, &props);
        Self {
            command: FIREWALL_FILTER_COMMAND.to_string(),
            props,
            descriptors,
        }
    }

    pub fn firewall() -> Self {
        Self::new(PropertySet::firewall())
    }

    pub fn name(&self) -> &'static str {
        "firewall"
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn properties(&self) -> &PropertySet {
        &self.props
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    /// Declare every descriptor this projector emits samples for.
    pub fn describe<E>(&self, sink: &mut E)
    where
        E: Extend<Arc<MetricDescriptor>>,
    {
        sink.extend(self.descriptors.iter().map(|(_, d)| d.clone()));
    }

    /// Poll one device and push its samples into the context sink.
    ///
    /// Only a failed fetch is returned as an error. Unparseable values and
    /// samples that cannot be built go to the context reporter and the poll
    /// moves on to the next field.
    pub async fn collect<C: DeviceClient>(
        &self,
        ctx: &mut CollectorContext<'_, C>,
    ) -> Result<CollectSummary, CollectError> {
        let rows = self.fetch(ctx).await?;

        let mut summary = CollectSummary {
            rows: rows.len(),
            ..CollectSummary::default()
        };

        // Rules without a comment have no stable identity and a reused
        // comment would export two series with identical labels. The first
        // rule with a given comment wins.
        let mut seen = HashSet::new();
        for row in &rows {
            let comment = row.get(COMMENT_FIELD);
            if comment.is_empty() || !seen.insert(comment) {
                continue;
            }
            summary.retained += 1;
            self.collect_for_row(row, ctx, &mut summary);
        }

        debug!(
            device = %ctx.device.name,
            rows = summary.rows,
            retained = summary.retained,
            samples = summary.samples,
            errors = summary.errors,
            "collected firewall rule metrics"
        );

        Ok(summary)
    }

    async fn fetch<C: DeviceClient>(
        &self,
        ctx: &mut CollectorContext<'_, C>,
    ) -> Result<Vec<Row>, CollectError> {
        let args = [format!("=.proplist={}", self.props.to_proplist())];

        ctx.client
            .run(&self.command, &args)
            .await
            .map_err(|source| {
                error!(
                    device = %ctx.device.name,
                    error = %source,
                    "error fetching firewall metrics"
                );
                CollectError::Fetch {
                    device: ctx.device.name.clone(),
                    address: ctx.device.address.clone(),
                    command: self.command.clone(),
                    source,
                }
            })
    }

    fn collect_for_row<C>(
        &self,
        row: &Row,
        ctx: &mut CollectorContext<'_, C>,
        summary: &mut CollectSummary,
    ) {
        for (property, desc) in self.descriptors.iter() {
            match self.sample_for_property(property, desc, row, ctx.device) {
                Ok(Some(sample)) => {
                    ctx.sink.accept(sample);
                    summary.samples += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    summary.errors += 1;
                    ctx.reporter.report(err);
                }
            }
        }
    }

    /// `Ok(None)` when the device left the counter empty.
    fn sample_for_property(
        &self,
        property: &str,
        desc: &Arc<MetricDescriptor>,
        row: &Row,
        device: &DeviceIdentity,
    ) -> Result<Option<Sample>, CollectError> {
        let raw = row.get(property);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value: f64 = trimmed.parse().map_err(|source| CollectError::Parse {
            device: device.name.clone(),
            address: device.address.clone(),
            property: property.to_string(),
            value: raw.to_string(),
            source,
        })?;

        Sample::counter(desc.clone(), value, self.label_values(device, row))
            .map(Some)
            .map_err(|source| CollectError::SampleConstruction {
                device: device.name.clone(),
                address: device.address.clone(),
                property: property.to_string(),
                source,
            })
    }

    fn label_values(&self, device: &DeviceIdentity, row: &Row) -> Vec<String> {
        [device.name.clone(), device.address.clone()]
            .into_iter()
            .chain(
                self.props
                    .identity_fields()
                    .iter()
                    .map(|f| row.get(f).to_string()),
            )
            .collect()
    }
}

impl Default for StatProjector {
    fn default() -> Self {
        Self::firewall()
    }
}
