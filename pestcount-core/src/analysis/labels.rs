use std::path::Path;

use snafu::ResultExt;
use tracing::warn;

use crate::{
    consts::{DEFAULT_LABELS, UNKNOWN_LABEL},
    error::{LabelsReadSnafu, PestCountError},
};

/// Ordered class names of the detection model, indexed by class id.
///
/// Loaded once when the pipeline is set up and only read afterwards. A class
/// id past the end of the list resolves to the `unknown` sentinel instead of
/// failing the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
    unknown: String,
}

impl LabelSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            unknown: UNKNOWN_LABEL.to_string(),
        }
    }

    /// Replaces the sentinel reported for uncovered class ids.
    pub fn with_unknown(mut self, unknown: impl Into<String>) -> Self {
        self.unknown = unknown.into();
        self
    }

    /// Parses one label per line, trimming surrounding whitespace.
    ///
    /// Blank lines inside the list are kept so the class indices of later
    /// labels do not shift; trailing blank lines are dropped.
    pub fn parse(text: &str) -> Self {
        let mut names: Vec<&str> = text.lines().map(str::trim).collect();
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        Self::new(names)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PestCountError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(LabelsReadSnafu {
            path: path.to_string_lossy(),
        })?;
        Ok(Self::parse(&text))
    }

    /// Reads `path`, falling back to the built-in label list when the file is
    /// missing or unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(labels) => labels,
            Err(err) => {
                warn!("Using built-in labels: {}", err);
                Self::default()
            }
        }
    }

    pub fn resolve(&self, class_id: usize) -> &str {
        self.names
            .get(class_id)
            .map(String::as_str)
            .unwrap_or(&self.unknown)
    }

    pub fn unknown(&self) -> &str {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS)
    }
}
