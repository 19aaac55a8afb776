use crate::classifier::EmotionLabel;
use anyhow::bail;
use serde::Serialize;
use std::str::FromStr;

/// Mood bucket a song belongs to. The CSV uses inconsistent casing
/// ("Chill", "energetic"), so parsing is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodBucket {
    Chill,
    Energetic,
    Cheerful,
    Romantic,
}

impl MoodBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodBucket::Chill => "chill",
            MoodBucket::Energetic => "energetic",
            MoodBucket::Cheerful => "cheerful",
            MoodBucket::Romantic => "romantic",
        }
    }

    /// Fixed many-to-one mapping from detected emotion to bucket.
    pub fn for_label(label: EmotionLabel) -> MoodBucket {
        match label {
            EmotionLabel::Angry => MoodBucket::Chill,
            EmotionLabel::Disgusted => MoodBucket::Chill,
            EmotionLabel::Fearful => MoodBucket::Chill,
            EmotionLabel::Happy => MoodBucket::Energetic,
            EmotionLabel::Neutral => MoodBucket::Cheerful,
            EmotionLabel::Sad => MoodBucket::Romantic,
            EmotionLabel::Surprised => MoodBucket::Cheerful,
        }
    }
}

impl FromStr for MoodBucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chill" => Ok(MoodBucket::Chill),
            "energetic" => Ok(MoodBucket::Energetic),
            "cheerful" => Ok(MoodBucket::Cheerful),
            "romantic" => Ok(MoodBucket::Romantic),
            other => bail!("Unknown mood bucket {:?}", other),
        }
    }
}

/// One row of the mood/song table. Immutable after startup.
#[derive(Debug, Clone, Serialize)]
pub struct SongRecord {
    pub id: usize,
    pub name: String,
    pub album: String,
    pub artist: String,
    pub mood: MoodBucket,
}
