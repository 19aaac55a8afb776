mod load;
mod song;

pub use load::MoodTable;
pub use song::{MoodBucket, SongRecord};
