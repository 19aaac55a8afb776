use crate::classifier::EmotionLabel;
use std::collections::HashMap;

/// Last detected mood per session key. An entry lives until the session
/// captures again or revisits the capture page.
#[derive(Default)]
pub struct MoodVault {
    moods: HashMap<String, EmotionLabel>,
}

impl MoodVault {
    pub fn set(&mut self, key: &str, label: EmotionLabel) {
        self.moods.insert(key.to_string(), label);
    }

    pub fn get(&self, key: &str) -> Option<EmotionLabel> {
        self.moods.get(key).copied()
    }

    pub fn clear(&mut self, key: &str) {
        self.moods.remove(key);
    }
}
