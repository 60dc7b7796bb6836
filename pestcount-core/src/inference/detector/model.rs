use std::path::Path;

use snafu::ResultExt;

use crate::{
    config::DetectorConfig,
    error::{ModelReadSnafu, PestCountError},
    inference::model::Model,
};

/// The exported pest detection network: YOLO-style head with four box
/// channels followed by one score channel per label.
pub struct PestDetector {
    bytes: Vec<u8>,
    config: DetectorConfig,
}

impl PestDetector {
    pub fn new(bytes: Vec<u8>, config: DetectorConfig) -> Self {
        Self { bytes, config }
    }

    pub fn from_file<P: AsRef<Path>>(
        path: P,
        config: DetectorConfig,
    ) -> Result<Self, PestCountError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(ModelReadSnafu {
            path: path.to_string_lossy(),
        })?;
        Ok(Self::new(bytes, config))
    }
}

impl Model for PestDetector {
    type Config = DetectorConfig;

    const INPUT_NAME: &'static str = "images";

    const OUTPUT_NAME: &'static str = "output0";

    const MODEL_NAME: &'static str = "PestDetection";

    fn load(&self) -> &[u8] {
        &self.bytes
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
