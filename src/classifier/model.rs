//! Emotion classification via ONNX Runtime.
//!
//! Wraps a pre-trained 7-class facial emotion network. The model is an
//! external artifact; this module only runs its forward pass.

use super::emotion::{ClassificationResult, EmotionLabel, EMOTION_CLASS_COUNT};
use crate::error::PipelineError;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

/// A loaded emotion model. `classify` needs `&mut` because the underlying
/// session does; callers share it behind a mutex.
#[derive(Debug)]
pub struct EmotionModel {
    session: Session,
}

impl EmotionModel {
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        if !model_path.exists() {
            return Err(PipelineError::ResourceUnavailable(format!(
                "model artifact not found at {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .and_then(|builder| builder.with_intra_threads(2))
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|err| {
                PipelineError::ResourceUnavailable(format!(
                    "failed to load model from {}: {}",
                    model_path.display(),
                    err
                ))
            })?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded emotion model"
        );

        Ok(Self { session })
    }

    /// Run a single forward pass over a `(1, 48, 48, 1)` tensor and pick the
    /// top class. Deterministic for fixed weights and input.
    pub fn classify(&mut self, input: &Array4<f32>) -> Result<ClassificationResult, PipelineError> {
        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|err| PipelineError::ModelUnavailable(format!("bad input tensor: {}", err)))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|err| PipelineError::ModelUnavailable(format!("inference failed: {}", err)))?;

        let (_, raw) = outputs[0].try_extract_tensor::<f32>().map_err(|err| {
            PipelineError::ModelUnavailable(format!("output extraction failed: {}", err))
        })?;

        if raw.len() < EMOTION_CLASS_COUNT {
            return Err(PipelineError::ModelUnavailable(format!(
                "expected {} class scores, got {}",
                EMOTION_CLASS_COUNT,
                raw.len()
            )));
        }

        let mut confidences = [0.0f32; EMOTION_CLASS_COUNT];
        confidences.copy_from_slice(&raw[..EMOTION_CLASS_COUNT]);

        let index = argmax(&confidences);
        let label = EmotionLabel::from_index(index).ok_or_else(|| {
            PipelineError::ModelUnavailable(format!("argmax index {} out of range", index))
        })?;

        Ok(ClassificationResult { label, confidences })
    }
}

/// Index of the maximum value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = i;
        }
    }
    best
}
