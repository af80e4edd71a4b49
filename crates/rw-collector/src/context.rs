use crate::report::ErrorReporter;
use rw_core::{ClientError, DeviceIdentity, Row, Sample};
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// A session that can run a device command and return its rows.
pub trait DeviceClient: Send {
    fn run(
        &mut self,
        command: &str,
        args: &[String],
    ) -> impl Future<Output = Result<Vec<Row>, ClientError>> + Send;
}

impl<S> DeviceClient for rw_api::Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn run(&mut self, command: &str, args: &[String]) -> Result<Vec<Row>, ClientError> {
        let reply = rw_api::Client::<S>::run(self, command, args).await?;
        Ok(reply.re)
    }
}

/// Destination for finished samples. Accepting never blocks.
pub trait SampleSink: Send {
    fn accept(&mut self, sample: Sample);
}

impl SampleSink for Vec<Sample> {
    fn accept(&mut self, sample: Sample) {
        self.push(sample);
    }
}

impl SampleSink for UnboundedSender<Sample> {
    fn accept(&mut self, sample: Sample) {
        if self.send(sample).is_err() {
            trace!("sample receiver dropped, discarding sample");
        }
    }
}

/// Everything one poll of one device needs.
pub struct CollectorContext<'a, C> {
    pub client: &'a mut C,
    pub device: &'a DeviceIdentity,
    pub sink: &'a mut dyn SampleSink,
    pub reporter: &'a dyn ErrorReporter,
}

impl<'a, C: DeviceClient> CollectorContext<'a, C> {
    pub fn new(
        client: &'a mut C,
        device: &'a DeviceIdentity,
        sink: &'a mut dyn SampleSink,
        reporter: &'a dyn ErrorReporter,
    ) -> Self {
        Self {
            client,
            device,
            sink,
            reporter,
        }
    }
}
