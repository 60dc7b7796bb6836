use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{
    analysis::{detection::Detection, insects::InsectClassifier, labels::LabelSet},
    consts::{SEVERITY_MEDIUM_MAX, SEVERITY_MEDIUM_MIN},
    error::{PestCountError, SerializeSnafu},
};

/// Coarse risk tier derived from the total insect count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// `< 5` is low, `5..=20` is medium, anything above is high.
    pub fn from_total(total: usize) -> Self {
        match total {
            t if t < SEVERITY_MEDIUM_MIN => Severity::Low,
            t if t <= SEVERITY_MEDIUM_MAX => Severity::Medium,
            _ => Severity::High,
        }
    }

    pub const fn name(&self) -> &str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

/// Running totals for one label while a pass is being aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationEntry {
    pub label: String,
    pub count: usize,
    pub total_confidence: f32,
}

impl AggregationEntry {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            count: 0,
            total_confidence: 0.0,
        }
    }

    fn add(&mut self, confidence: f32) {
        self.count += 1;
        self.total_confidence += confidence;
    }

    pub fn mean_confidence(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.total_confidence / self.count as f32
        }
    }
}

/// Per-label slice of a [`CountResult`].
///
/// Serializes as `{"count": N, "confidence": mean}`, the shape history
/// records and sync payloads expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub count: usize,
    #[serde(rename = "confidence")]
    pub mean_confidence: f32,
}

impl From<&AggregationEntry> for LabelSummary {
    fn from(entry: &AggregationEntry) -> Self {
        Self {
            count: entry.count,
            mean_confidence: entry.mean_confidence(),
        }
    }
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountResult {
    pub total_detections: usize,
    pub breakdown: BTreeMap<String, LabelSummary>,
    pub severity: Severity,
}

/// Groups detections by resolved label.
///
/// Grouping is by label text rather than class id, so two ids that share a
/// name fold into one entry. The map lives only for the duration of the call.
pub fn aggregate(detections: &[Detection], labels: &LabelSet) -> CountResult {
    let mut entries: BTreeMap<&str, AggregationEntry> = BTreeMap::new();

    for detection in detections {
        let label = labels.resolve(detection.class_id);
        entries
            .entry(label)
            .or_insert_with(|| AggregationEntry::new(label))
            .add(detection.confidence);
    }

    let total_detections = entries.values().map(|entry| entry.count).sum();
    let breakdown = entries
        .into_iter()
        .map(|(label, entry)| (label.to_string(), LabelSummary::from(&entry)))
        .collect();

    CountResult {
        total_detections,
        breakdown,
        severity: Severity::from_total(total_detections),
    }
}

impl CountResult {
    pub fn is_empty(&self) -> bool {
        self.total_detections == 0
    }

    /// Breakdown ordered by count, largest first; ties keep label order.
    pub fn sorted_by_count(&self) -> Vec<(&str, &LabelSummary)> {
        let mut items: Vec<_> = self
            .breakdown
            .iter()
            .map(|(label, summary)| (label.as_str(), summary))
            .collect();
        items.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        items
    }

    /// Number of detections whose label the classifier considers a pest.
    pub fn pest_count(&self, classifier: &dyn InsectClassifier) -> usize {
        self.breakdown
            .iter()
            .filter(|(label, _)| !classifier.is_beneficial(label))
            .map(|(_, summary)| summary.count)
            .sum()
    }

    /// One line per label, e.g. `• aphids: 3 (70% conf)`.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No insects detected.".to_string();
        }

        self.sorted_by_count()
            .into_iter()
            .map(|(label, summary)| {
                format!(
                    "• {}: {} ({:.0}% conf)",
                    label,
                    summary.count,
                    summary.mean_confidence * 100.0
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The breakdown as `{"label": {"count": N, "confidence": mean}}`.
    pub fn breakdown_json(&self) -> Result<String, PestCountError> {
        serde_json::to_string(&self.breakdown).context(SerializeSnafu)
    }
}
