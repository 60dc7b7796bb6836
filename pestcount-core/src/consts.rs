/// The number of values representing bounding box coordinates in YOLO format.
///
/// YOLO heads emit 4 values per anchor: [center_x, center_y, width, height].
/// Class scores start at this channel index in the model output tensor.
pub const CXYWH_OFFSET: usize = 4;

/// Side length of the square canvas the detection model was exported with.
///
/// Photos are letterboxed into a `TARGET_SIZE` x `TARGET_SIZE` canvas before
/// being encoded, and decoded boxes are mapped back out of that canvas.
pub const TARGET_SIZE: u32 = 640;

/// Minimum confidence for an anchor to become a detection.
///
/// The comparison is strict: an anchor scoring exactly this value is dropped.
/// The value is deliberately low so that small insects, which tend to score
/// weakly, are still counted:
/// - Lower values (0.05-0.1): more small insects found, more false positives
/// - Higher values (0.25-0.4): cleaner boxes, small insects start to vanish
pub const PROBA_THRESHOLD: f32 = 0.12;

/// IoU threshold for Non-Maximum Suppression (NMS).
///
/// A candidate whose IoU against an already accepted, higher-confidence box
/// is strictly greater than this value is suppressed.
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Magnitude below which model coordinates are treated as normalized.
///
/// Some exported models emit box coordinates in [0, 1], others in canvas
/// pixels. When both center-x and width are below this limit the decoder
/// assumes the normalized convention and rescales by the canvas size.
pub const NORMALIZED_COORD_LIMIT: f32 = 2.0;

/// Number of color channels in the encoded input (R, G, B).
pub const INPUT_CHANNELS: usize = 3;

/// Batch size for model inference.
pub const BATCH_SIZE: usize = 1;

/// Letterbox border color (black).
pub const BACKGROUND_FILL: [u8; 3] = [0, 0, 0];

/// Label reported for a class id the label set does not cover.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Labels used when no label file can be read.
pub const DEFAULT_LABELS: [&str; 4] = [
    "leafbeetle",
    "leafhopper",
    "pygmygrasshopper",
    "slantfacedgrasshopper",
];

/// Lowercase name fragments of insects that are beneficial rather than pests.
pub const BENEFICIAL_INSECTS: [&str; 2] = ["pygmygrasshopper", "pygmy grasshopper"];

/// Severity tiers: totals below `SEVERITY_MEDIUM_MIN` are low, totals above
/// `SEVERITY_MEDIUM_MAX` are high.
pub const SEVERITY_MEDIUM_MIN: usize = 5;
pub const SEVERITY_MEDIUM_MAX: usize = 20;

/// Box outline color for pests.
pub const PEST_COLOR: [u8; 3] = [255, 0, 0];

/// Box outline color for beneficial insects (#4CAF50).
pub const BENEFICIAL_COLOR: [u8; 3] = [76, 175, 80];

/// Default intra-op thread count for the ONNX Runtime session.
pub const INTRA_THREADS: usize = 4;
