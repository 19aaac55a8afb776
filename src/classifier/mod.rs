mod emotion;
mod image_input;
mod model;
mod provider;

pub use emotion::{ClassificationResult, EmotionLabel, MoodAsset};
pub use image_input::decode_capture;
pub use provider::{EmotionClassifier, OnnxEmotionClassifier};

#[cfg(test)]
pub(crate) use provider::test_support::{FixedEmotionClassifier, UnavailableEmotionClassifier};
