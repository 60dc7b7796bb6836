use glam::Vec2;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, imageops::FilterType};
use serde::Serialize;
use snafu::ensure;

use crate::error::{ConfigInvalidSnafu, EmptyImageSnafu, PestCountError};

/// Uniform scale and centering offsets that place a photo inside the square
/// model canvas.
///
/// `scale = target_size / max(width, height)`, so the longer side of the photo
/// exactly fills the canvas and the shorter side gets equal padding on both
/// ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LetterboxTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub target_size: u32,
}

impl LetterboxTransform {
    /// Computes the transform for a `width` x `height` source.
    pub fn fit(width: u32, height: u32, target_size: u32) -> Result<Self, PestCountError> {
        ensure!(
            target_size > 0,
            ConfigInvalidSnafu {
                message: "target_size must be positive",
            }
        );
        ensure!(width > 0 && height > 0, EmptyImageSnafu { width, height });

        let target = target_size as f32;
        let scale = target / width.max(height) as f32;
        let scaled_w = width as f32 * scale;
        let scaled_h = height as f32 * scale;

        Ok(Self {
            scale,
            offset_x: (target - scaled_w) / 2.0,
            offset_y: (target - scaled_h) / 2.0,
            target_size,
        })
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.offset_x, self.offset_y)
    }

    /// Maps a point from source-image pixels into the canvas.
    pub fn to_canvas(&self, point: Vec2) -> Vec2 {
        point * self.scale + self.offset()
    }

    /// Maps a canvas point back into source-image pixels.
    pub fn to_source(&self, point: Vec2) -> Vec2 {
        (point - self.offset()) / self.scale
    }

    /// Maps a canvas length (width/height) back into source-image pixels.
    pub fn size_to_source(&self, size: Vec2) -> Vec2 {
        size / self.scale
    }
}

/// Scales `image` uniformly into a `target_size` square canvas filled with
/// `fill`, centered, and returns the canvas with the transform used.
///
/// The canvas is drawn on whole pixels, so the drawn image can sit up to half
/// a pixel away from the exact fractional offsets kept in the transform.
pub fn letterbox(
    image: &DynamicImage,
    target_size: u32,
    fill: [u8; 3],
) -> Result<(RgbImage, LetterboxTransform), PestCountError> {
    let (w0, h0) = image.dimensions();
    let transform = LetterboxTransform::fit(w0, h0, target_size)?;

    let w_new = ((w0 as f32 * transform.scale).round() as u32).clamp(1, target_size);
    let h_new = ((h0 as f32 * transform.scale).round() as u32).clamp(1, target_size);

    let resized = image
        .resize_exact(w_new, h_new, FilterType::Triangle)
        .to_rgb8();

    let mut canvas = RgbImage::from_pixel(target_size, target_size, Rgb(fill));
    let x = (target_size - w_new) / 2;
    let y = (target_size - h_new) / 2;
    image::imageops::overlay(&mut canvas, &resized, x as i64, y as i64);

    Ok((canvas, transform))
}
