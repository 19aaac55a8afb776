mod video_search;

pub use video_search::{NoOpVideoSearch, VideoResult, VideoSearch, YoutubeSearchClient};
