use serde::Serialize;

use crate::analysis::bbox::Bbox;

/// One detected insect, boxed in original-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: Bbox,
    /// Best class score of the anchor, in `[0, 1]`.
    pub confidence: f32,
    /// Index into the label set; may be past its end.
    pub class_id: usize,
}

impl Detection {
    pub fn new(bbox: Bbox, confidence: f32, class_id: usize) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}
