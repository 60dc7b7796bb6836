use glam::Vec2;
use ndarray::{Array3, ArrayView1, ArrayView2, Axis, s};
use snafu::{ResultExt, ensure};

use crate::{
    analysis::{bbox::Bbox, detection::Detection},
    config::DetectorConfig,
    consts::CXYWH_OFFSET,
    error::{OutputLayoutSnafu, OutputSizeSnafu, PestCountError, ShapeSnafu},
    process::letterbox::LetterboxTransform,
};

/// Which of the two inner dimensions of a `[1, A, B]` output holds anchors.
///
/// Exported detectors disagree on this and the model file does not say, so it
/// is inferred from the sizes: there are always far more anchors than
/// channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `[1, channels, anchors]`, indexed by channel then anchor.
    ChannelMajor,
    /// `[1, anchors, channels]`, indexed by anchor then channel.
    AnchorMajor,
}

impl OutputLayout {
    /// `dim_a > dim_b` means anchor-major; equal sizes count as channel-major.
    pub fn infer(dim_a: usize, dim_b: usize) -> Self {
        if dim_a > dim_b {
            OutputLayout::AnchorMajor
        } else {
            OutputLayout::ChannelMajor
        }
    }
}

/// Raw output tensor of the detection model, checked against its declared
/// shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    tensor: Array3<f32>,
    layout: OutputLayout,
}

impl RawOutput {
    /// Wraps flat tensor data declared as `shape`.
    ///
    /// Fails when the shape is not `[batch, a, b]` with a non-empty batch, when
    /// its element count disagrees with `data`, or when there is no room for
    /// at least one class score next to the four box channels.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self, PestCountError> {
        let &[batch, dim_a, dim_b] = shape else {
            return OutputLayoutSnafu {
                shape,
                reason: "expected rank 3",
            }
            .fail();
        };

        let Some(expected) = batch
            .checked_mul(dim_a)
            .and_then(|n| n.checked_mul(dim_b))
        else {
            return OutputLayoutSnafu {
                shape,
                reason: "element count overflows",
            }
            .fail();
        };
        ensure!(
            expected == data.len(),
            OutputSizeSnafu {
                shape,
                expected,
                actual: data.len(),
            }
        );

        let tensor = Array3::from_shape_vec((batch, dim_a, dim_b), data)
            .context(ShapeSnafu { stage: "output" })?;
        Self::from_array(tensor)
    }

    pub fn from_array(tensor: Array3<f32>) -> Result<Self, PestCountError> {
        let &[batch, dim_a, dim_b] = tensor.shape() else {
            unreachable!("Array3 always has three axes")
        };
        ensure!(
            batch > 0,
            OutputLayoutSnafu {
                shape: tensor.shape(),
                reason: "empty batch",
            }
        );
        ensure!(
            dim_a.min(dim_b) > CXYWH_OFFSET,
            OutputLayoutSnafu {
                shape: tensor.shape(),
                reason: "no class score channels",
            }
        );

        Ok(Self {
            layout: OutputLayout::infer(dim_a, dim_b),
            tensor,
        })
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    pub fn shape(&self) -> &[usize] {
        self.tensor.shape()
    }

    pub fn anchor_count(&self) -> usize {
        let shape = self.tensor.shape();
        shape[1].max(shape[2])
    }

    pub fn channel_count(&self) -> usize {
        let shape = self.tensor.shape();
        shape[1].min(shape[2])
    }

    pub fn class_count(&self) -> usize {
        self.channel_count() - CXYWH_OFFSET
    }

    /// First batch entry as a `[channels, anchors]` view, whatever the
    /// underlying layout.
    fn channel_major(&self) -> ArrayView2<'_, f32> {
        let view = self.tensor.index_axis(Axis(0), 0);
        match self.layout {
            OutputLayout::ChannelMajor => view,
            OutputLayout::AnchorMajor => view.reversed_axes(),
        }
    }
}

/// Index and score of the best class; the first of equal maxima wins.
fn best_class(scores: ArrayView1<f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, max)| score > max) {
            best = Some((idx, score));
        }
    }
    best
}

/// Turns the raw model output into candidate detections in source-image
/// coordinates. The result is unordered and not yet suppressed.
///
/// Two heuristics are applied exactly as observed on exported models rather
/// than guaranteed by any format:
/// - the layout is inferred by [`OutputLayout::infer`];
/// - when both center-x and width are below `config.normalized_limit` the
///   box is taken to be normalized and is scaled by the canvas size.
pub fn decode(
    output: &RawOutput,
    config: &DetectorConfig,
    transform: &LetterboxTransform,
) -> Vec<Detection> {
    let mut detections = Vec::new();
    let canvas = transform.target_size as f32;

    for anchor in output.channel_major().axis_iter(Axis(1)) {
        let Some((class_id, proba)) = best_class(anchor.slice(s![CXYWH_OFFSET..])) else {
            continue;
        };

        // Strict comparison: a score equal to the threshold is dropped
        if proba <= config.proba_threshold {
            continue;
        }

        let mut center = Vec2::new(anchor[0], anchor[1]);
        let mut size = Vec2::new(anchor[2], anchor[3]);

        if center.x < config.normalized_limit && size.x < config.normalized_limit {
            center *= canvas;
            size *= canvas;
        }

        let bbox = Bbox::from_center_size(
            transform.to_source(center),
            transform.size_to_source(size),
        );
        detections.push(Detection::new(bbox, proba, class_id));
    }

    detections
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One synthetic anchor: `[cx, cy, w, h]` plus class scores.
    pub(crate) struct Anchor {
        pub cxcywh: [f32; 4],
        pub scores: Vec<f32>,
    }

    /// Builds flat data for `anchors` in either layout, padding the remaining
    /// `total` anchors with zeros.
    pub(crate) fn tensor_data(
        anchors: &[Anchor],
        classes: usize,
        total: usize,
        layout: OutputLayout,
    ) -> (Vec<usize>, Vec<f32>) {
        let channels = CXYWH_OFFSET + classes;
        let mut data = vec![0.0; channels * total];
        for (i, anchor) in anchors.iter().enumerate() {
            let values = anchor.cxcywh.iter().chain(anchor.scores.iter());
            for (c, &value) in values.enumerate() {
                let idx = match layout {
                    OutputLayout::ChannelMajor => c * total + i,
                    OutputLayout::AnchorMajor => i * channels + c,
                };
                data[idx] = value;
            }
        }
        let shape = match layout {
            OutputLayout::ChannelMajor => vec![1, channels, total],
            OutputLayout::AnchorMajor => vec![1, total, channels],
        };
        (shape, data)
    }

    fn raw(anchors: &[Anchor], classes: usize, total: usize, layout: OutputLayout) -> RawOutput {
        let (shape, data) = tensor_data(anchors, classes, total, layout);
        RawOutput::from_shape_vec(&shape, data).unwrap()
    }

    fn identity() -> LetterboxTransform {
        LetterboxTransform::fit(640, 640, 640).unwrap()
    }

    #[test]
    fn test_layout_inference() {
        assert_eq!(OutputLayout::infer(8, 8400), OutputLayout::ChannelMajor);
        assert_eq!(OutputLayout::infer(8400, 8), OutputLayout::AnchorMajor);
        assert_eq!(OutputLayout::infer(8, 8), OutputLayout::ChannelMajor);
    }

    #[test]
    fn test_raw_output_validation() {
        assert!(matches!(
            RawOutput::from_shape_vec(&[1, 8, 10], vec![0.0; 79]),
            Err(PestCountError::OutputSize {
                expected: 80,
                actual: 79,
                ..
            })
        ));
        assert!(matches!(
            RawOutput::from_shape_vec(&[8, 10], vec![0.0; 80]),
            Err(PestCountError::OutputLayout { .. })
        ));
        assert!(matches!(
            RawOutput::from_shape_vec(&[0, 8, 10], vec![]),
            Err(PestCountError::OutputLayout { .. })
        ));
        assert!(matches!(
            RawOutput::from_shape_vec(&[1, usize::MAX / 2, 8], vec![0.0; 8]),
            Err(PestCountError::OutputLayout { .. })
        ));
        assert!(matches!(
            RawOutput::from_shape_vec(&[1, 4, 10], vec![0.0; 40]),
            Err(PestCountError::OutputLayout { .. })
        ));

        let output = RawOutput::from_shape_vec(&[1, 8400, 8], vec![0.0; 8 * 8400]).unwrap();
        assert_eq!(output.layout(), OutputLayout::AnchorMajor);
        assert_eq!(output.anchor_count(), 8400);
        assert_eq!(output.channel_count(), 8);
        assert_eq!(output.class_count(), 4);
    }

    #[test]
    fn test_both_layouts_decode_the_same() {
        let anchors = [
            Anchor {
                cxcywh: [100.0, 120.0, 30.0, 40.0],
                scores: vec![0.1, 0.8, 0.05, 0.0],
            },
            Anchor {
                cxcywh: [400.0, 300.0, 50.0, 20.0],
                scores: vec![0.0, 0.0, 0.0, 0.65],
            },
            Anchor {
                cxcywh: [10.0, 10.0, 5.0, 5.0],
                scores: vec![0.05, 0.02, 0.01, 0.1],
            },
        ];
        let config = DetectorConfig::default();
        let transform = LetterboxTransform::fit(1280, 720, 640).unwrap();

        let channel_major = raw(&anchors, 4, 8400, OutputLayout::ChannelMajor);
        let anchor_major = raw(&anchors, 4, 8400, OutputLayout::AnchorMajor);
        assert_eq!(channel_major.shape(), &[1, 8, 8400]);
        assert_eq!(anchor_major.shape(), &[1, 8400, 8]);

        let a = decode(&channel_major, &config, &transform);
        let b = decode(&anchor_major, &config, &transform);
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);

        assert_eq!(a[0].class_id, 1);
        assert_eq!(a[0].confidence, 0.8);
        assert_eq!(a[1].class_id, 3);
    }

    #[test]
    fn test_threshold_is_strict() {
        let config = DetectorConfig::default();
        let at = Anchor {
            cxcywh: [100.0, 100.0, 10.0, 10.0],
            scores: vec![config.proba_threshold],
        };
        let above = Anchor {
            cxcywh: [300.0, 300.0, 10.0, 10.0],
            scores: vec![config.proba_threshold + 1e-4],
        };

        let detections = decode(
            &raw(&[at, above], 1, 16, OutputLayout::ChannelMajor),
            &config,
            &identity(),
        );
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox.center(), Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_first_maximum_wins() {
        let anchor = Anchor {
            cxcywh: [100.0, 100.0, 10.0, 10.0],
            scores: vec![0.2, 0.6, 0.6],
        };
        let detections = decode(
            &raw(&[anchor], 3, 16, OutputLayout::AnchorMajor),
            &DetectorConfig::default(),
            &identity(),
        );
        assert_eq!(detections[0].class_id, 1);
    }

    #[test]
    fn test_inverse_letterbox() {
        // 1280x720 photo: scale 0.5, 140px of padding above and below
        let transform = LetterboxTransform::fit(1280, 720, 640).unwrap();
        let anchor = Anchor {
            cxcywh: [320.0, 320.0, 100.0, 50.0],
            scores: vec![0.9],
        };
        let detections = decode(
            &raw(&[anchor], 1, 16, OutputLayout::ChannelMajor),
            &DetectorConfig::default(),
            &transform,
        );
        let bbox = detections[0].bbox;
        assert_eq!(bbox, Bbox::from_ltrb(540.0, 310.0, 740.0, 410.0));
    }

    #[test]
    fn test_canvas_box_round_trip() {
        for (w, h) in [(1280, 720), (720, 1280), (4032, 3024), (333, 777)] {
            let transform = LetterboxTransform::fit(w, h, 640).unwrap();
            let original = Bbox::from_ltrb(w as f32 * 0.25, h as f32 * 0.4, w as f32 * 0.5, h as f32 * 0.6);
            let center = transform.to_canvas(original.center());
            let size = original.size() * transform.scale;

            let anchor = Anchor {
                cxcywh: [center.x, center.y, size.x, size.y],
                scores: vec![0.7],
            };
            let detections = decode(
                &raw(&[anchor], 1, 16, OutputLayout::ChannelMajor),
                &DetectorConfig::default(),
                &transform,
            );
            let recovered = detections[0].bbox;
            assert!((recovered.min - original.min).length() < 0.05, "{}x{}", w, h);
            assert!((recovered.max - original.max).length() < 0.05, "{}x{}", w, h);
        }
    }

    // The `< 2.0` magnitude check is a heuristic for models that export
    // normalized coordinates, not a contract of the output format.
    #[test]
    fn test_normalized_coordinate_heuristic() {
        let config = DetectorConfig::default();
        let normalized = Anchor {
            cxcywh: [0.5, 0.25, 0.1, 0.05],
            scores: vec![0.9],
        };
        let detections = decode(
            &raw(&[normalized], 1, 16, OutputLayout::ChannelMajor),
            &config,
            &identity(),
        );
        assert_eq!(detections[0].bbox.center(), Vec2::new(320.0, 160.0));
        assert_eq!(detections[0].bbox.size(), Vec2::new(64.0, 32.0));

        // Small center but pixel-sized width: left untouched
        let mixed = Anchor {
            cxcywh: [1.5, 100.0, 12.0, 12.0],
            scores: vec![0.9],
        };
        let detections = decode(
            &raw(&[mixed], 1, 16, OutputLayout::ChannelMajor),
            &config,
            &identity(),
        );
        assert_eq!(detections[0].bbox.center(), Vec2::new(1.5, 100.0));
        assert_eq!(detections[0].bbox.size(), Vec2::new(12.0, 12.0));
    }

    #[test]
    fn test_all_below_threshold_is_empty() {
        let (shape, data) = tensor_data(&[], 4, 8400, OutputLayout::ChannelMajor);
        let output = RawOutput::from_shape_vec(&shape, data).unwrap();
        let detections = decode(&output, &DetectorConfig::default(), &identity());
        assert!(detections.is_empty());
    }
}
