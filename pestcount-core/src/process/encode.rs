use image::RgbImage;
use ndarray::Array4;

use crate::{
    config::InputLayout,
    consts::{BATCH_SIZE, INPUT_CHANNELS},
};

/// Converts the letterboxed canvas into the model's float input.
///
/// Each 8-bit channel value is divided by 255. With [`InputLayout::Nhwc`] the
/// flat buffer walks pixels in row-major order and emits R, G, B per pixel;
/// with [`InputLayout::Nchw`] it emits the full R plane, then G, then B. The
/// returned array is always in standard layout, so `as_slice()` yields the
/// flat `3 × H × W` buffer.
pub fn encode(canvas: &RgbImage, layout: InputLayout) -> Array4<f32> {
    let (width, height) = canvas.dimensions();
    let (w, h) = (width as usize, height as usize);

    match layout {
        InputLayout::Nhwc => {
            Array4::from_shape_fn((BATCH_SIZE, h, w, INPUT_CHANNELS), |(_, y, x, c)| {
                canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
            })
        }
        InputLayout::Nchw => {
            Array4::from_shape_fn((BATCH_SIZE, INPUT_CHANNELS, h, w), |(_, c, y, x)| {
                canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
            })
        }
    }
}
