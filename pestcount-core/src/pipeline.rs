use std::sync::Arc;

use image::DynamicImage;
use ndarray::Array4;
use serde::Serialize;
use snafu::ResultExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    analysis::{
        count::{CountResult, aggregate},
        detection::Detection,
        labels::LabelSet,
    },
    config::DetectorConfig,
    error::{JoinSnafu, PestCountError},
    inference::model::Invoker,
    process::{
        decode::{RawOutput, decode},
        encode::encode,
        letterbox::{LetterboxTransform, letterbox},
        nms::nms,
    },
};

/// Everything one detection pass hands to rendering, storage and sync.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionOutput {
    /// Surviving boxes, strongest first.
    pub detections: Vec<Detection>,
    pub count: CountResult,
    pub transform: LetterboxTransform,
}

/// Letterbox → encode → infer → decode → suppress → aggregate.
///
/// Each call is independent: the only state kept between calls is the
/// invoker, the label set and the configuration, none of which a pass
/// mutates.
pub struct Pipeline<I: Invoker> {
    invoker: I,
    labels: LabelSet,
    config: DetectorConfig,
}

impl<I: Invoker> Pipeline<I> {
    /// Builds a pipeline; `config.unknown_label` replaces the label set's
    /// sentinel for class ids past the end of `labels`.
    pub fn new(invoker: I, labels: LabelSet, config: DetectorConfig) -> Self {
        Self {
            invoker,
            labels: labels.with_unknown(config.unknown_label.clone()),
            config,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<(Array4<f32>, LetterboxTransform), PestCountError> {
        let (canvas, transform) =
            letterbox(image, self.config.target_size, self.config.background_fill)?;
        Ok((encode(&canvas, self.config.input_layout), transform))
    }

    /// Decodes, suppresses and aggregates one raw model output.
    pub fn postprocess(
        &self,
        output: &RawOutput,
        transform: &LetterboxTransform,
    ) -> (Vec<Detection>, CountResult) {
        if self.labels.len() < output.class_count() {
            warn!(
                labels = self.labels.len(),
                classes = output.class_count(),
                unknown = self.labels.unknown(),
                "Label set is shorter than the model's class channels"
            );
        }

        let candidates = decode(output, &self.config, transform);
        let raw_count = candidates.len();

        let detections = nms(candidates, self.config.iou_threshold);
        debug!(
            "NMS kept {} out of {} candidates",
            detections.len(),
            raw_count
        );

        let count = aggregate(&detections, &self.labels);
        (detections, count)
    }

    /// Runs one full pass over `image`.
    ///
    /// Any failure ends the pass with a single error; an image with no
    /// insects is a successful pass with an empty count.
    #[tracing::instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&mut self, image: &DynamicImage) -> Result<DetectionOutput, PestCountError> {
        let (input, transform) = self.preprocess(image)?;

        let output = self.invoker.infer(&input)?;
        debug!(
            shape = ?output.shape(),
            layout = ?output.layout(),
            "Inference completed"
        );

        let (detections, count) = self.postprocess(&output, &transform);
        info!(
            total = count.total_detections,
            severity = count.severity.name(),
            "Detection pass finished"
        );

        Ok(DetectionOutput {
            detections,
            count,
            transform,
        })
    }
}

/// A [`Pipeline`] that can be shared between tasks.
///
/// Passes run on tokio's blocking pool so they never stall the caller's
/// thread, and the mutex keeps at most one inference in flight per invoker.
pub struct SharedPipeline<I: Invoker> {
    inner: Arc<Mutex<Pipeline<I>>>,
}

impl<I: Invoker> Clone for SharedPipeline<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I> SharedPipeline<I>
where
    I: Invoker + Send + 'static,
{
    pub fn new(pipeline: Pipeline<I>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// Runs one pass on the blocking pool. Pass an `Arc` to keep using the
    /// photo afterwards without copying it.
    pub async fn detect(
        &self,
        image: impl Into<Arc<DynamicImage>>,
    ) -> Result<DetectionOutput, PestCountError> {
        let inner = Arc::clone(&self.inner);
        let image = image.into();
        tokio::task::spawn_blocking(move || {
            let mut pipeline = inner.blocking_lock();
            pipeline.detect(&image)
        })
        .await
        .context(JoinSnafu)?
    }
}
