use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use glam::Vec2;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use snafu::ResultExt;

use crate::{
    analysis::{detection::Detection, insects::InsectClassifier, labels::LabelSet},
    consts::{BENEFICIAL_COLOR, PEST_COLOR},
    error::{FontSnafu, ImageWriteSnafu, IoReadSnafu, PestCountError},
};

/// Draws detection boxes on a copy of the original photo.
///
/// Pests are outlined in red and beneficial insects in green. When a font is
/// loaded each box also gets a filled tag reading `"<label> <pct>%"`.
pub struct Annotator<'a> {
    labels: &'a LabelSet,
    classifier: &'a dyn InsectClassifier,
    font: Option<FontVec>,
}

impl<'a> Annotator<'a> {
    pub fn new(labels: &'a LabelSet, classifier: &'a dyn InsectClassifier) -> Self {
        Self {
            labels,
            classifier,
            font: None,
        }
    }

    pub fn classifier(&self) -> &'a dyn InsectClassifier {
        self.classifier
    }

    pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, PestCountError> {
        let path = path.as_ref();
        let data = std::fs::read(path).context(IoReadSnafu {
            path: path.to_string_lossy(),
        })?;
        self.font = Some(FontVec::try_from_vec(data).context(FontSnafu {})?);
        Ok(self)
    }

    pub fn annotate(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut output_img = image.to_rgb8();
        let (width, height) = output_img.dimensions();
        let bounds = Vec2::new(width as f32, height as f32);

        let stroke = (width / 80).max(1) as i32;
        let font_scale = PxScale::from((width as f32 / 25.0).max(12.0));

        for detection in detections {
            // Boxes can spill past the photo edge after the inverse letterbox
            let bbox = detection.bbox.clamp(Vec2::ZERO, bounds);
            let x = bbox.left().round() as i32;
            let y = bbox.top().round() as i32;
            let w = bbox.width().round() as i32;
            let h = bbox.height().round() as i32;

            if w <= 0 || h <= 0 {
                continue;
            }

            let label = self.labels.resolve(detection.class_id);
            let color = if self.classifier.is_beneficial(label) {
                Rgb(BENEFICIAL_COLOR)
            } else {
                Rgb(PEST_COLOR)
            };

            // Thick outline grown outward from the box edge
            for offset in 0..stroke {
                let thick_rect = Rect::at(x - offset, y - offset)
                    .of_size((w + offset * 2) as u32, (h + offset * 2) as u32);
                draw_hollow_rect_mut(&mut output_img, thick_rect, color);
            }

            let Some(font) = &self.font else {
                continue;
            };

            let text = format!("{} {:.0}%", label, detection.confidence * 100.0);
            let (text_w, text_h) = text_size(font_scale, font, &text);
            let tag = Rect::at(x, y - text_h as i32 - 10).of_size(text_w + 10, text_h + 10);
            draw_filled_rect_mut(&mut output_img, tag, color);
            draw_text_mut(
                &mut output_img,
                Rgb([255, 255, 255]),
                x + 5,
                y - text_h as i32 - 5,
                font_scale,
                font,
                &text,
            );
        }

        output_img
    }

    pub fn save<P: AsRef<Path>>(
        &self,
        image: &DynamicImage,
        detections: &[Detection],
        output: P,
    ) -> Result<(), PestCountError> {
        let annotated = self.annotate(image, detections);
        annotated.save(output.as_ref()).context(ImageWriteSnafu {
            path: output.as_ref().to_string_lossy(),
        })
    }
}
