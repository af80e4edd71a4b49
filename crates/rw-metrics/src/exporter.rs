use crate::families::{encode_samples, register_descriptors, render_text};
use anyhow::{Context, Result};
use futures::future::join_all;
use prometheus::{GaugeVec, IntCounterVec, Opts, Registry};
use rw_collector::{
    CollectSummary, CollectorContext, DeviceClient, ErrorReporter, StatProjector,
    log_collect_error,
};
use rw_core::{ClientError, CollectError, Config, Device, NAMESPACE, Sample};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::BufStream;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Opens an authenticated session to a device.
pub trait Connector: Send + Sync + 'static {
    type Client: DeviceClient;

    fn connect(
        &self,
        device: &Device,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Client, ClientError>> + Send;
}

/// Connects over the RouterOS API port.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouterOsConnector;

impl Connector for RouterOsConnector {
    type Client = rw_api::Client<BufStream<TcpStream>>;

    async fn connect(&self, device: &Device, timeout: Duration) -> Result<Self::Client, ClientError> {
        rw_api::Client::connect(device, timeout).await
    }
}

/// Reporter that logs recovered errors and counts them per device.
pub struct CountingReporter {
    errors: IntCounterVec,
}

impl ErrorReporter for CountingReporter {
    fn report(&self, error: CollectError) {
        log_collect_error(&error);
        self.errors
            .with_label_values(&[error.device(), error.kind()])
            .inc();
    }
}

/// Polls every configured device and renders the result for Prometheus.
pub struct Exporter<K = RouterOsConnector> {
    devices: Vec<Device>,
    timeout: Duration,
    connector: K,
    projector: Arc<StatProjector>,
    registry: Registry,
    scrape_duration: GaugeVec,
    scrape_success: GaugeVec,
    reporter: CountingReporter,
}

impl Exporter<RouterOsConnector> {
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.devices.clone(),
            config.timeout(),
            RouterOsConnector,
            Arc::new(StatProjector::firewall()),
        )
    }
}

impl<K: Connector> Exporter<K> {
    pub fn new(
        devices: Vec<Device>,
        timeout: Duration,
        connector: K,
        projector: Arc<StatProjector>,
    ) -> Result<Self> {
        let mut descriptors = Vec::new();
        projector.describe(&mut descriptors);
        register_descriptors(&descriptors).context("failed to register collector metrics")?;

        let registry = Registry::new();

        let scrape_duration = GaugeVec::new(
            Opts::new("scrape_collector_duration_seconds", "Duration of a collector scrape")
                .namespace(NAMESPACE),
            &["device", "collector"],
        )?;
        registry.register(Box::new(scrape_duration.clone()))?;

        let scrape_success = GaugeVec::new(
            Opts::new(
                "scrape_collector_success",
                "Whether a collector succeeded (1=success, 0=failure)",
            )
            .namespace(NAMESPACE),
            &["device", "collector"],
        )?;
        registry.register(Box::new(scrape_success.clone()))?;

        let errors = IntCounterVec::new(
            Opts::new(
                "collect_errors_total",
                "Device values that could not be exported",
            )
            .namespace(NAMESPACE),
            &["device", "kind"],
        )?;
        registry.register(Box::new(errors.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            devices,
            timeout,
            connector,
            projector,
            registry,
            scrape_duration,
            scrape_success,
            reporter: CountingReporter { errors },
        })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Poll all devices concurrently and return every sample collected.
    pub async fn scrape(&self) -> Vec<Sample> {
        join_all(self.devices.iter().map(|d| self.scrape_device(d)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Poll a single device by name.
    pub async fn scrape_one(&self, name: &str) -> Option<Vec<Sample>> {
        let device = self.devices.iter().find(|d| d.name == name)?;
        Some(self.scrape_device(device).await)
    }

    async fn scrape_device(&self, device: &Device) -> Vec<Sample> {
        let start = Instant::now();
        let mut samples = Vec::new();
        let result = self.poll_device(device, &mut samples).await;

        let collector = self.projector.name();
        self.scrape_duration
            .with_label_values(&[&device.name, collector])
            .set(start.elapsed().as_secs_f64());

        let success = match result {
            Ok(summary) => {
                debug!(
                    device = %device.name,
                    samples = summary.samples,
                    errors = summary.errors,
                    "device scrape finished"
                );
                1.0
            }
            Err(e) => {
                warn!(device = %device.name, error = %format!("{:#}", e), "device scrape failed");
                0.0
            }
        };
        self.scrape_success
            .with_label_values(&[&device.name, collector])
            .set(success);

        samples
    }

    async fn poll_device(&self, device: &Device, samples: &mut Vec<Sample>) -> Result<CollectSummary> {
        let identity = device.identity();
        let mut client = self
            .connector
            .connect(device, self.timeout)
            .await
            .with_context(|| format!("failed to connect to {}", device.name))?;

        let mut ctx = CollectorContext::new(&mut client, &identity, samples, &self.reporter);
        let summary = self.projector.collect(&mut ctx).await?;
        Ok(summary)
    }

    /// One fresh scrape of every device plus the exporter's own metrics, in
    /// Prometheus text format.
    pub async fn render(&self) -> Result<String> {
        let samples = self.scrape().await;
        let mut families = encode_samples(&samples);
        families.extend(self.registry.gather());
        render_text(&families)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::Row;
    use std::collections::HashMap;

    #[derive(Clone)]
    enum Behaviour {
        Rows(Vec<Row>),
        Refuse,
        Trap,
    }

    struct FakeConnector {
        devices: HashMap<String, Behaviour>,
    }

    struct FakeClient {
        behaviour: Behaviour,
    }

    impl DeviceClient for FakeClient {
        async fn run(&mut self, command: &str, _args: &[String]) -> Result<Vec<Row>, ClientError> {
            match &self.behaviour {
                Behaviour::Rows(rows) => Ok(rows.clone()),
                _ => Err(ClientError::Trap {
                    command: command.to_string(),
                    message: "not enough permissions".into(),
                }),
            }
        }
    }

    impl Connector for FakeConnector {
        type Client = FakeClient;

        async fn connect(&self, device: &Device, _timeout: Duration) -> Result<FakeClient, ClientError> {
            match self.devices.get(&device.name) {
                Some(Behaviour::Refuse) | None => Err(ClientError::Connect {
                    address: device.endpoint(),
                    source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
                }),
                Some(behaviour) => Ok(FakeClient {
                    behaviour: behaviour.clone(),
                }),
            }
        }
    }

    fn device(name: &str, address: &str) -> Device {
        Device {
            name: name.into(),
            address: address.into(),
            port: 8728,
            user: "prometheus".into(),
            password: String::new(),
        }
    }

    fn exporter() -> Exporter<FakeConnector> {
        let rows = vec![
            Row::from([
                ("chain", "forward"),
                ("action", "accept"),
                ("disabled", "false"),
                ("comment", "ssh"),
                ("bytes", "1024"),
                ("packets", "8"),
            ]),
            Row::from([("chain", "input"), ("comment", "broken"), ("bytes", "n/a")]),
        ];

        let connector = FakeConnector {
            devices: HashMap::from([
                ("edge".to_string(), Behaviour::Rows(rows)),
                ("down".to_string(), Behaviour::Refuse),
                ("locked".to_string(), Behaviour::Trap),
            ]),
        };

        Exporter::new(
            vec![
                device("edge", "10.0.0.1"),
                device("down", "10.0.0.2"),
                device("locked", "10.0.0.3"),
            ],
            Duration::from_secs(1),
            connector,
            Arc::new(StatProjector::firewall()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_scrape_isolates_failing_devices() {
        let exporter = exporter();
        let samples = exporter.scrape().await;

        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|s| s.label("name") == Some("edge")));
    }

    #[tokio::test]
    async fn test_scrape_one() {
        let exporter = exporter();
        assert_eq!(exporter.scrape_one("edge").await.unwrap().len(), 2);
        assert!(exporter.scrape_one("down").await.unwrap().is_empty());
        assert!(exporter.scrape_one("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_render_includes_self_metrics() {
        let exporter = exporter();
        let text = exporter.render().await.unwrap();

        assert!(text.contains("# TYPE mikrotik_firewall_rule_bytes counter"));
        assert!(text.contains(
            r#"mikrotik_firewall_rule_bytes{name="edge",address="10.0.0.1",chain="forward",action="accept",disabled="false",comment="ssh"} 1024"#
        ));
        assert!(text.contains(r#"mikrotik_scrape_collector_success{collector="firewall",device="edge"} 1"#));
        assert!(text.contains(r#"mikrotik_scrape_collector_success{collector="firewall",device="down"} 0"#));
        assert!(text.contains(r#"mikrotik_scrape_collector_success{collector="firewall",device="locked"} 0"#));
        assert!(text.contains(r#"mikrotik_collect_errors_total{device="edge",kind="parse"} 1"#));
        assert!(text.contains("mikrotik_scrape_collector_duration_seconds"));
    }
}
