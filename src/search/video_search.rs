//! HTTP client for the external video search API.

use crate::classifier::EmotionLabel;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const RESULT_PAGE_SIZE: usize = 10;

/// One hit from the video search API.
#[derive(Debug, Clone, Serialize)]
pub struct VideoResult {
    pub title: String,
    pub video_id: String,
    pub thumbnail_url: String,
}

/// Search seam for the server; deployments without an API key plug in
/// [`NoOpVideoSearch`].
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, label: EmotionLabel) -> Result<Vec<VideoResult>, PipelineError>;
}

/// Always returns an empty result list.
pub struct NoOpVideoSearch;

#[async_trait]
impl VideoSearch for NoOpVideoSearch {
    async fn search(&self, _label: EmotionLabel) -> Result<Vec<VideoResult>, PipelineError> {
        Ok(vec![])
    }
}

pub struct YoutubeSearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YoutubeSearchClient {
    pub fn new(api_key: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

pub(crate) fn build_query(label: EmotionLabel) -> String {
    format!("{} mood songs", label.as_str())
}

#[async_trait]
impl VideoSearch for YoutubeSearchClient {
    async fn search(&self, label: EmotionLabel) -> Result<Vec<VideoResult>, PipelineError> {
        let url = format!("{}/search", self.base_url);
        let query = build_query(label);
        debug!("Searching videos for {:?}", query);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", &RESULT_PAGE_SIZE.to_string()),
                ("q", &query),
                ("key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|err| {
                PipelineError::SearchUnavailable(format!("search request failed: {}", err))
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::SearchUnavailable(format!(
                "search API responded with status {}",
                response.status()
            )));
        }

        let body: SearchListResponse = response.json().await.map_err(|err| {
            PipelineError::SearchUnavailable(format!("search response decode failed: {}", err))
        })?;

        Ok(body.into_results())
    }
}

#[derive(Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchItemSnippet,
}

#[derive(Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct SearchItemSnippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

impl SearchListResponse {
    fn into_results(self) -> Vec<VideoResult> {
        self.items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(VideoResult {
                    title: item.snippet.title,
                    video_id,
                    thumbnail_url: item
                        .snippet
                        .thumbnails
                        .default
                        .map(|t| t.url)
                        .unwrap_or_default(),
                })
            })
            .take(RESULT_PAGE_SIZE)
            .collect()
    }
}
