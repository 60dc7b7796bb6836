use serde::Serialize;

use crate::consts::BENEFICIAL_INSECTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InsectKind {
    Pest,
    Beneficial,
}

/// Decides whether a detected label is a pest or a beneficial insect.
///
/// This is a domain policy kept apart from the detection math, so callers can
/// swap the membership table without touching the aggregator.
pub trait InsectClassifier {
    fn classify(&self, label: &str) -> InsectKind;

    fn is_beneficial(&self, label: &str) -> bool {
        self.classify(label) == InsectKind::Beneficial
    }
}

impl<F> InsectClassifier for F
where
    F: Fn(&str) -> InsectKind,
{
    fn classify(&self, label: &str) -> InsectKind {
        self(label)
    }
}

/// Substring table of beneficial insects, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficialList {
    fragments: Vec<String>,
}

impl BeneficialList {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fragments: fragments
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for BeneficialList {
    fn default() -> Self {
        Self::new(BENEFICIAL_INSECTS)
    }
}

impl InsectClassifier for BeneficialList {
    fn classify(&self, label: &str) -> InsectKind {
        let label = label.to_lowercase();
        if self.fragments.iter().any(|f| label.contains(f.as_str())) {
            InsectKind::Beneficial
        } else {
            InsectKind::Pest
        }
    }
}
