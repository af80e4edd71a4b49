use crate::sample::SampleError;
use std::num::ParseFloatError;
use std::time::Duration;
use thiserror::Error;

/// Failure of a device session or of a command run over it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("command {command} failed: {message}")]
    Trap { command: String, message: String },

    #[error("session closed by device: {0}")]
    Fatal(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors raised while projecting one device poll into samples.
///
/// Only `Fetch` ends a poll. The other variants are reported and the poll
/// carries on with the next field.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("error fetching {command} from {device} ({address}): {source}")]
    Fetch {
        device: String,
        address: String,
        command: String,
        #[source]
        source: ClientError,
    },

    #[error("error parsing {property} value {value:?} from {device} ({address}): {source}")]
    Parse {
        device: String,
        address: String,
        property: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("error building {property} sample for {device} ({address}): {source}")]
    SampleConstruction {
        device: String,
        address: String,
        property: String,
        #[source]
        source: SampleError,
    },
}

impl CollectError {
    /// Short label used for error counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Parse { .. } => "parse",
            Self::SampleConstruction { .. } => "sample",
        }
    }

    pub fn device(&self) -> &str {
        match self {
            Self::Fetch { device, .. }
            | Self::Parse { device, .. }
            | Self::SampleConstruction { device, .. } => device,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Self::Fetch { address, .. }
            | Self::Parse { address, .. }
            | Self::SampleConstruction { address, .. } => address,
        }
    }

    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Fetch { .. } => None,
            Self::Parse { property, .. } | Self::SampleConstruction { property, .. } => {
                Some(property)
            }
        }
    }

    /// Raw value the device sent, for parse failures.
    pub fn raw_value(&self) -> Option<&str> {
        match self {
            Self::Parse { value, .. } => Some(value),
            _ => None,
        }
    }
}
