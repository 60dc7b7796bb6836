use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{
    consts::*,
    error::{ConfigInvalidSnafu, ConfigParseSnafu, ConfigReadSnafu, PestCountError},
};

/// Memory layout of the encoded input tensor.
///
/// `Nhwc` keeps each pixel's R, G, B values adjacent, which is what the
/// exported mobile model was trained with. `Nchw` stores one full plane per
/// channel, the usual layout of ONNX exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    #[default]
    Nhwc,
    Nchw,
}

/// Tunables of the detection pipeline.
///
/// Every field has a default, so a JSON config file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct DetectorConfig {
    /// Side length of the square model input.
    pub target_size: u32,
    /// Letterbox border color.
    pub background_fill: [u8; 3],
    pub input_layout: InputLayout,
    /// Anchors whose best class score is not strictly above this are dropped.
    pub proba_threshold: f32,
    /// Overlap above which the weaker of two boxes is suppressed.
    pub iou_threshold: f32,
    /// See [`NORMALIZED_COORD_LIMIT`].
    pub normalized_limit: f32,
    #[builder(setter(into))]
    pub unknown_label: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_size: TARGET_SIZE,
            background_fill: BACKGROUND_FILL,
            input_layout: InputLayout::Nhwc,
            proba_threshold: PROBA_THRESHOLD,
            iou_threshold: NMS_IOU_THRESHOLD,
            normalized_limit: NORMALIZED_COORD_LIMIT,
            unknown_label: UNKNOWN_LABEL.to_string(),
        }
    }
}

fn check(target_size: u32, proba_threshold: f32, iou_threshold: f32) -> Result<(), String> {
    if target_size == 0 {
        return Err("target_size must be positive".to_string());
    }
    if !(0.0..1.0).contains(&proba_threshold) {
        return Err(format!(
            "proba_threshold must be in [0, 1), got {}",
            proba_threshold
        ));
    }
    if !(0.0..=1.0).contains(&iou_threshold) {
        return Err(format!(
            "iou_threshold must be in [0, 1], got {}",
            iou_threshold
        ));
    }
    Ok(())
}

impl DetectorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let defaults = DetectorConfig::default();
        check(
            self.target_size.unwrap_or(defaults.target_size),
            self.proba_threshold.unwrap_or(defaults.proba_threshold),
            self.iou_threshold.unwrap_or(defaults.iou_threshold),
        )
    }
}

impl DetectorConfig {
    pub fn builder() -> DetectorConfigBuilder {
        DetectorConfigBuilder::default()
    }

    /// Loads a JSON config file; missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PestCountError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).context(ConfigReadSnafu {
            path: path.to_string_lossy(),
        })?;
        let config: Self = serde_json::from_str(&raw).context(ConfigParseSnafu {
            path: path.to_string_lossy(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PestCountError> {
        check(self.target_size, self.proba_threshold, self.iou_threshold)
            .map_err(|message| ConfigInvalidSnafu { message }.build())
    }

    /// Number of `f32` values in one encoded input image.
    pub fn input_len(&self) -> usize {
        let side = self.target_size as usize;
        INPUT_CHANNELS * side * side
    }
}
