//! Lazy, single-flight model provisioning.

use super::emotion::ClassificationResult;
use super::model::EmotionModel;
use crate::error::PipelineError;
use async_trait::async_trait;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::info;

/// Classification seam for the server; lets tests run the router without an
/// ONNX runtime.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, input: Array4<f32>) -> Result<ClassificationResult, PipelineError>;
}

/// Loads the ONNX model at most once, downloading the artifact first if it is
/// not on disk. Inference runs on a blocking thread so a slow forward pass
/// does not serialize unrelated requests.
pub struct OnnxEmotionClassifier {
    model_path: PathBuf,
    model_url: Option<String>,
    model: OnceCell<Arc<Mutex<EmotionModel>>>,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: PathBuf, model_url: Option<String>) -> Self {
        Self {
            model_path,
            model_url,
            model: OnceCell::new(),
        }
    }

    /// Concurrent first calls collapse into one download/load; the cell is
    /// only initialized on success, so a failed fetch is retried on the next
    /// request.
    async fn model(&self) -> Result<Arc<Mutex<EmotionModel>>, PipelineError> {
        self.model
            .get_or_try_init(|| async {
                if !self.model_path.exists() {
                    let url = self.model_url.as_ref().ok_or_else(|| {
                        PipelineError::ResourceUnavailable(format!(
                            "model artifact missing at {} and no download URL configured",
                            self.model_path.display()
                        ))
                    })?;
                    download_model(url, &self.model_path).await?;
                }

                let path = self.model_path.clone();
                let model = tokio::task::spawn_blocking(move || EmotionModel::load(&path))
                    .await
                    .map_err(|err| {
                        PipelineError::ModelUnavailable(format!("model load task failed: {}", err))
                    })??;

                Ok(Arc::new(Mutex::new(model)))
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl EmotionClassifier for OnnxEmotionClassifier {
    async fn classify(&self, input: Array4<f32>) -> Result<ClassificationResult, PipelineError> {
        let model = self.model().await?;
        tokio::task::spawn_blocking(move || model.lock().unwrap().classify(&input))
            .await
            .map_err(|err| {
                PipelineError::ModelUnavailable(format!("inference task failed: {}", err))
            })?
    }
}

async fn download_model(url: &str, dest: &Path) -> Result<(), PipelineError> {
    info!("Downloading emotion model from {}...", url);

    let response = reqwest::get(url).await.map_err(|err| {
        PipelineError::ResourceUnavailable(format!("model download failed: {}", err))
    })?;

    if !response.status().is_success() {
        return Err(PipelineError::ResourceUnavailable(format!(
            "model download failed with status {}",
            response.status()
        )));
    }

    let bytes = response.bytes().await.map_err(|err| {
        PipelineError::ResourceUnavailable(format!("model download read failed: {}", err))
    })?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            PipelineError::ResourceUnavailable(format!("could not create model dir: {}", err))
        })?;
    }

    // Write to a temp file and rename, so a crashed download never leaves a
    // truncated artifact at the final path.
    let partial = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&partial).await.map_err(|err| {
        PipelineError::ResourceUnavailable(format!("could not create model file: {}", err))
    })?;
    file.write_all(&bytes).await.map_err(|err| {
        PipelineError::ResourceUnavailable(format!("could not write model file: {}", err))
    })?;
    file.flush().await.map_err(|err| {
        PipelineError::ResourceUnavailable(format!("could not flush model file: {}", err))
    })?;
    drop(file);
    tokio::fs::rename(&partial, dest).await.map_err(|err| {
        PipelineError::ResourceUnavailable(format!("could not move model into place: {}", err))
    })?;

    info!("Model artifact saved to {} ({} bytes)", dest.display(), bytes.len());
    Ok(())
}
