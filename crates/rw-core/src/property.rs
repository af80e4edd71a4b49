use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Identity field used to deduplicate rows within a poll.
pub const COMMENT_FIELD: &str = "comment";

static PROPERTY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("property name pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertySetError {
    #[error("property set must export at least one metric field")]
    NoMetricFields,

    #[error("identity fields must include '{}'", COMMENT_FIELD)]
    MissingComment,

    #[error("invalid property name '{0}'")]
    InvalidName(String),

    #[error("property '{0}' is listed more than once")]
    Duplicate(String),

    #[error("property '{0}' is both an identity field and a metric field")]
    Overlap(String),
}

/// Ordered list of properties requested from a device in one command.
///
/// Identity fields label and deduplicate rows; metric fields are exported as
/// samples. Identity fields always come first in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySet {
    identity: Vec<String>,
    metrics: Vec<String>,
}

impl PropertySet {
    pub fn new<I, M>(identity: I, metrics: M) -> Result<Self, PropertySetError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let identity: Vec<String> = identity.into_iter().map(Into::into).collect();
        let metrics: Vec<String> = metrics.into_iter().map(Into::into).collect();

        if metrics.is_empty() {
            return Err(PropertySetError::NoMetricFields);
        }
        if !identity.iter().any(|f| f == COMMENT_FIELD) {
            return Err(PropertySetError::MissingComment);
        }

        let mut seen = HashSet::new();
        for field in &identity {
            Self::check_name(field)?;
            if !seen.insert(field.as_str()) {
                return Err(PropertySetError::Duplicate(field.clone()));
            }
        }

        let mut seen_metrics = HashSet::new();
        for field in &metrics {
            Self::check_name(field)?;
            if seen.contains(field.as_str()) {
                return Err(PropertySetError::Overlap(field.clone()));
            }
            if !seen_metrics.insert(field.as_str()) {
                return Err(PropertySetError::Duplicate(field.clone()));
            }
        }

        Ok(Self { identity, metrics })
    }

    /// The firewall filter rule properties exported by default.
    pub fn firewall() -> Self {
        Self {
            identity: ["chain", "action", "disabled", COMMENT_FIELD]
                .into_iter()
                .map(String::from)
                .collect(),
            metrics: ["bytes", "packets"].into_iter().map(String::from).collect(),
        }
    }

    fn check_name(name: &str) -> Result<(), PropertySetError> {
        if PROPERTY_NAME.is_match(name) {
            Ok(())
        } else {
            Err(PropertySetError::InvalidName(name.to_string()))
        }
    }

    pub fn identity_fields(&self) -> &[String] {
        &self.identity
    }

    pub fn metric_fields(&self) -> &[String] {
        &self.metrics
    }

    /// All fields in request order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.identity
            .iter()
            .chain(self.metrics.iter())
            .map(String::as_str)
    }

    /// Comma separated value for the `.proplist` command argument.
    pub fn to_proplist(&self) -> String {
        self.fields().collect::<Vec<_>>().join(",")
    }
}

impl Default for PropertySet {
    fn default() -> Self {
        Self::firewall()
    }
}
