use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PestCountError {
    #[snafu(display("Image has zero dimension: {}x{}", width, height))]
    EmptyImage { width: u32, height: u32 },
    #[snafu(display("Read image `{}` error: {}", path, source))]
    ImageRead {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Ort Session init stage `{}` error: {}", stage, source))]
    OrtInit {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Build Tensor for `{}` error: {}", stage, source))]
    Tensor {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Onnx Inference error: {}", source))]
    Inference { source: ort::error::Error },
    #[snafu(display("Onnx Output can not found {}", output_name))]
    NotFoundOutput { output_name: String },
    #[snafu(display("Ndarray Shape error at stage `{}`: {}", stage, source))]
    Shape {
        source: ndarray::ShapeError,
        stage: String,
    },
    #[snafu(display(
        "Output tensor declares shape {:?} ({} elements) but holds {}",
        shape,
        expected,
        actual
    ))]
    OutputSize {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[snafu(display("Output tensor shape {:?} is unusable: {}", shape, reason))]
    OutputLayout {
        shape: Vec<usize>,
        reason: &'static str,
    },
    #[snafu(display("Read labels `{}` error: {}", path, source))]
    LabelsRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Read model `{}` error: {}", path, source))]
    ModelRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Read config `{}` error: {}", path, source))]
    ConfigRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Parse config `{}` error: {}", path, source))]
    ConfigParse {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid config: {}", message))]
    ConfigInvalid { message: String },
    #[snafu(display("Serialize breakdown error: {}", source))]
    Serialize { source: serde_json::Error },
    #[snafu(display("Load Font error: {}", source))]
    Font { source: ab_glyph::InvalidFont },
    #[snafu(display("Image Write error: {}", source))]
    ImageWrite {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Read `{}` error: {}", path, source))]
    IoRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Detection worker failed: {}", source))]
    Join { source: tokio::task::JoinError },
}

impl PestCountError {
    /// Whether the error was raised before the model ran, i.e. the photo itself
    /// is unusable and a different one should be submitted.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::EmptyImage { .. } | Self::ImageRead { .. })
    }
}
