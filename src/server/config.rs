use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Directory with the emoji images and mood clips, served under /assets.
    pub assets_dir_path: Option<String>,
    pub song_sample_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            assets_dir_path: None,
            song_sample_size: 10,
        }
    }
}
