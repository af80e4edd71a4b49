use rw_core::CollectError;
use std::sync::Mutex;
use tracing::error;

/// Receives errors that a poll recovered from.
///
/// Fetch failures are returned from `collect` instead; reporters only see
/// per-field failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: CollectError);
}

/// Logs every reported error with its device and property context.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: CollectError) {
        log_collect_error(&error);
    }
}

pub fn log_collect_error(err: &CollectError) {
    match err {
        CollectError::Fetch {
            device,
            address,
            command,
            source,
        } => error!(
            device = %device,
            address = %address,
            command = %command,
            error = %source,
            "error fetching firewall metrics"
        ),
        CollectError::Parse {
            device,
            address,
            property,
            value,
            source,
        } => error!(
            device = %device,
            address = %address,
            property = %property,
            value = %value,
            error = %source,
            "error parsing firewall metric value"
        ),
        CollectError::SampleConstruction {
            device,
            address,
            property,
            source,
        } => error!(
            device = %device,
            address = %address,
            property = %property,
            error = %source,
            "error building firewall metric sample"
        ),
    }
}

/// Keeps reported errors in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    errors: Mutex<Vec<CollectError>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn take(&self) -> Vec<CollectError> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CollectError>> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: CollectError) {
        self.lock().push(error);
    }
}
