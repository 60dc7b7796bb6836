use ndarray::Array4;
use ort::{
    session::{Session, builder::SessionBuilder},
    value::TensorRef,
};
use snafu::{OptionExt, ResultExt};
use tracing::{debug, info};

use crate::{
    error::*,
    inference::{
        detector::model::PestDetector,
        model::{Invoker, Model},
    },
    process::decode::RawOutput,
};

/// ONNX Runtime backed [`Invoker`] for the pest detector.
///
/// The native session is created in [`OrtInvoker::new`] and released when
/// the invoker is dropped, on success and error paths alike.
pub struct OrtInvoker {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OrtInvoker {
    pub fn new(session: SessionBuilder, model: &PestDetector) -> Result<Self, PestCountError> {
        let session = session
            .commit_from_memory(model.load())
            .context(OrtInitSnafu { stage: "commit" })?;

        // Exported graphs do not agree on tensor names; prefer what the graph declares
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| PestDetector::INPUT_NAME.to_string());
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .unwrap_or_else(|| PestDetector::OUTPUT_NAME.to_string());

        info!(
            model = PestDetector::MODEL_NAME,
            target_size = model.config().target_size,
            %input_name,
            %output_name,
            "Detection session ready"
        );

        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }
}

impl Invoker for OrtInvoker {
    fn infer(&mut self, input: &Array4<f32>) -> Result<RawOutput, PestCountError> {
        let outputs = self
            .session
            .run(ort::inputs![
                self.input_name.as_str() => TensorRef::from_array_view(input).context(TensorSnafu { stage: "input" })?
            ])
            .context(InferenceSnafu {})?;

        let tensor = outputs
            .get(self.output_name.as_str())
            .context(NotFoundOutputSnafu {
                output_name: self.output_name.as_str(),
            })?
            .try_extract_array::<f32>()
            .context(TensorSnafu { stage: "extract" })?;

        debug!(shape = ?tensor.shape(), "Model output extracted");

        RawOutput::from_shape_vec(tensor.shape(), tensor.iter().copied().collect())
    }
}
