use ndarray::Array4;
use ort::{
    execution_providers::CPUExecutionProvider,
    session::{
        Session,
        builder::{GraphOptimizationLevel, SessionBuilder},
    },
};
use snafu::ResultExt;

use crate::{
    error::{OrtInitSnafu, PestCountError},
    process::decode::RawOutput,
};

pub trait Model {
    type Config;

    const INPUT_NAME: &'static str;
    const OUTPUT_NAME: &'static str;
    const MODEL_NAME: &'static str;

    fn load(&self) -> &[u8];
    fn config(&self) -> &Self::Config;
}

/// The inference engine as seen by the pipeline: one encoded image in, one
/// raw output tensor out.
///
/// Implementations own their native resources and release them on drop. A
/// single invoker runs at most one inference at a time, which `&mut self`
/// enforces.
pub trait Invoker {
    fn infer(&mut self, input: &Array4<f32>) -> Result<RawOutput, PestCountError>;
}

impl<I: Invoker + ?Sized> Invoker for Box<I> {
    fn infer(&mut self, input: &Array4<f32>) -> Result<RawOutput, PestCountError> {
        (**self).infer(input)
    }
}

/// common session builder
pub fn session_builder(intra_threads: usize) -> Result<SessionBuilder, PestCountError> {
    let session_builder = Session::builder()
        .context(OrtInitSnafu { stage: "builder" })?
        .with_execution_providers(vec![
            #[cfg(all(feature = "coreml", target_os = "macos"))]
            {
                use ort::execution_providers::CoreMLExecutionProvider;
                use ort::execution_providers::coreml::*;
                CoreMLExecutionProvider::default()
                    .with_model_format(CoreMLModelFormat::MLProgram)
                    .build()
            },
            #[cfg(feature = "cuda")]
            {
                use ort::execution_providers::CUDAExecutionProvider;
                CUDAExecutionProvider::default().build()
            },
            CPUExecutionProvider::default().build(),
        ])
        .context(OrtInitSnafu { stage: "provider" })?
        .with_optimization_level(GraphOptimizationLevel::Level1)
        .context(OrtInitSnafu {
            stage: "optimization",
        })?
        .with_intra_threads(intra_threads)
        .context(OrtInitSnafu {
            stage: "intra-threads",
        })?;

    Ok(session_builder)
}
