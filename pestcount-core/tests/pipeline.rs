use glam::Vec2;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{Array3, Array4};

use pestcount_core::{
    BeneficialList, DetectorConfig, LabelSet, PestCountError, Pipeline, Severity,
    inference::model::Invoker,
    process::decode::RawOutput,
};

const CLASSES: usize = 4;
const ANCHORS: usize = 8400;

/// Emits a YOLO-style tensor holding the given `(cx, cy, w, h, class, score)`
/// canvas boxes, in either layout.
struct SyntheticInvoker {
    boxes: Vec<(f32, f32, f32, f32, usize, f32)>,
    anchor_major: bool,
}

impl Invoker for SyntheticInvoker {
    fn infer(&mut self, input: &Array4<f32>) -> Result<RawOutput, PestCountError> {
        assert_eq!(input.len(), 3 * 640 * 640);

        let channels = 4 + CLASSES;
        let mut tensor = Array3::<f32>::zeros((1, channels, ANCHORS));
        for (anchor, &(cx, cy, w, h, class, score)) in self.boxes.iter().enumerate() {
            tensor[[0, 0, anchor]] = cx;
            tensor[[0, 1, anchor]] = cy;
            tensor[[0, 2, anchor]] = w;
            tensor[[0, 3, anchor]] = h;
            tensor[[0, 4 + class, anchor]] = score;
        }

        if self.anchor_major {
            tensor.swap_axes(1, 2);
            let shape = tensor.shape().to_vec();
            let data: Vec<f32> = tensor.iter().copied().collect();
            RawOutput::from_shape_vec(&shape, data)
        } else {
            RawOutput::from_array(tensor)
        }
    }
}

fn field_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(1280, 960, Rgb([80, 120, 40])))
}

fn labels() -> LabelSet {
    LabelSet::new(["aphids", "leafhopper", "pygmygrasshopper", "stemborer"])
}

fn infestation() -> Vec<(f32, f32, f32, f32, usize, f32)> {
    let mut boxes = Vec::new();
    // 22 well separated aphids on a grid
    for i in 0..22 {
        let cx = 40.0 + (i % 11) as f32 * 50.0;
        let cy = 200.0 + (i / 11) as f32 * 100.0;
        boxes.push((cx, cy, 20.0, 20.0, 0, 0.6));
    }
    // a weaker duplicate of the first aphid
    boxes.push((41.0, 201.0, 20.0, 20.0, 0, 0.3));
    // one beneficial grasshopper, normalized coordinates
    boxes.push((0.5, 0.75, 0.05, 0.05, 2, 0.9));
    boxes
}

#[test]
fn full_pass_counts_and_classifies() -> anyhow::Result<()> {
    let invoker = SyntheticInvoker {
        boxes: infestation(),
        anchor_major: false,
    };
    let mut pipeline = Pipeline::new(invoker, labels(), DetectorConfig::default());
    let output = pipeline.detect(&field_photo())?;

    assert_eq!(output.count.total_detections, 23);
    assert_eq!(output.count.severity, Severity::High);
    assert_eq!(output.count.breakdown["aphids"].count, 22);
    assert_eq!(output.count.breakdown["pygmygrasshopper"].count, 1);
    assert_eq!(output.count.pest_count(&BeneficialList::default()), 22);

    // Strongest first: the grasshopper, mapped from normalized canvas coords.
    // 1280x960 => scale 0.5, 80px of padding above and below.
    let grasshopper = output.detections[0];
    assert_eq!(grasshopper.class_id, 2);
    let center = grasshopper.bbox.center();
    assert!((center - Vec2::new(640.0, 800.0)).length() < 1e-3);
    assert!((grasshopper.bbox.width() - 64.0).abs() < 1e-3);

    let json: serde_json::Value = serde_json::from_str(&output.count.breakdown_json()?)?;
    assert_eq!(json["aphids"]["count"], 22);
    Ok(())
}

#[test]
fn layouts_are_interchangeable() -> anyhow::Result<()> {
    let mut channel_major = Pipeline::new(
        SyntheticInvoker {
            boxes: infestation(),
            anchor_major: false,
        },
        labels(),
        DetectorConfig::default(),
    );
    let mut anchor_major = Pipeline::new(
        SyntheticInvoker {
            boxes: infestation(),
            anchor_major: true,
        },
        labels(),
        DetectorConfig::default(),
    );

    let photo = field_photo();
    let a = channel_major.detect(&photo)?;
    let b = anchor_major.detect(&photo)?;
    assert_eq!(a.detections, b.detections);
    assert_eq!(a.count, b.count);
    Ok(())
}

#[test]
fn quiet_field_is_a_successful_empty_pass() -> anyhow::Result<()> {
    let invoker = SyntheticInvoker {
        boxes: vec![(320.0, 320.0, 30.0, 30.0, 1, 0.12)],
        anchor_major: true,
    };
    let mut pipeline = Pipeline::new(invoker, labels(), DetectorConfig::default());
    let output = pipeline.detect(&field_photo())?;

    assert_eq!(output.count.total_detections, 0);
    assert!(output.count.breakdown.is_empty());
    assert_eq!(output.count.severity, Severity::Low);
    assert_eq!(output.count.summary(), "No insects detected.");
    Ok(())
}

#[test]
fn empty_photo_fails_before_inference() {
    let invoker = SyntheticInvoker {
        boxes: Vec::new(),
        anchor_major: false,
    };
    let mut pipeline = Pipeline::new(invoker, labels(), DetectorConfig::default());
    let err = pipeline
        .detect(&DynamicImage::new_rgb8(640, 0))
        .expect_err("zero height must be rejected");
    assert!(matches!(err, PestCountError::EmptyImage { .. }));
}
