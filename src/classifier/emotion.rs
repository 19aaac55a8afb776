use serde::Serialize;

/// Number of classes in the emotion model's output layer.
pub const EMOTION_CLASS_COUNT: usize = 7;

/// Discrete facial emotion, in the model's output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EmotionLabel {
    Angry,
    Disgusted,
    Fearful,
    Happy,
    Neutral,
    Sad,
    Surprised,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; EMOTION_CLASS_COUNT] = [
        EmotionLabel::Angry,
        EmotionLabel::Disgusted,
        EmotionLabel::Fearful,
        EmotionLabel::Happy,
        EmotionLabel::Neutral,
        EmotionLabel::Sad,
        EmotionLabel::Surprised,
    ];

    pub fn from_index(index: usize) -> Option<EmotionLabel> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Disgusted => "Disgusted",
            EmotionLabel::Fearful => "Fearful",
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::Surprised => "Surprised",
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single capture classification.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub label: EmotionLabel,
    pub confidences: [f32; EMOTION_CLASS_COUNT],
}

/// Static emoji and mood-video asset paths for a label, relative to the
/// configured assets directory.
#[derive(Debug, Clone, Serialize)]
pub struct MoodAsset {
    pub emoji_path: &'static str,
    pub video_path: &'static str,
}

impl MoodAsset {
    pub fn for_label(label: EmotionLabel) -> MoodAsset {
        let (emoji_path, video_path) = match label {
            EmotionLabel::Angry => ("emojis/angry.png", "videos/angry.mp4"),
            EmotionLabel::Disgusted => ("emojis/disgusted.png", "videos/disgusted.mp4"),
            EmotionLabel::Fearful => ("emojis/fearful.png", "videos/fearful.mp4"),
            EmotionLabel::Happy => ("emojis/happy.png", "videos/happy.mp4"),
            EmotionLabel::Neutral => ("emojis/neutral.png", "videos/neutral.mp4"),
            EmotionLabel::Sad => ("emojis/sad.png", "videos/sad.mp4"),
            EmotionLabel::Surprised => ("emojis/surprised.png", "videos/surprised.mp4"),
        };
        MoodAsset {
            emoji_path,
            video_path,
        }
    }
}
