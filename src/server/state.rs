use axum::extract::FromRef;

use crate::classifier::EmotionClassifier;
use crate::moodtable::MoodTable;
use crate::search::VideoSearch;
use crate::user::UserManager;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::mood_vault::MoodVault;
use super::ServerConfig;

pub type GuardedUserManager = Arc<Mutex<UserManager>>;
pub type GuardedMoodVault = Arc<Mutex<MoodVault>>;
pub type SharedEmotionClassifier = Arc<dyn EmotionClassifier>;
pub type SharedVideoSearch = Arc<dyn VideoSearch>;
pub type SharedMoodTable = Arc<MoodTable>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub classifier: SharedEmotionClassifier,
    pub mood_table: SharedMoodTable,
    pub video_search: SharedVideoSearch,
    pub user_manager: GuardedUserManager,
    pub mood_vault: GuardedMoodVault,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for SharedEmotionClassifier {
    fn from_ref(input: &ServerState) -> Self {
        input.classifier.clone()
    }
}

impl FromRef<ServerState> for SharedMoodTable {
    fn from_ref(input: &ServerState) -> Self {
        input.mood_table.clone()
    }
}

impl FromRef<ServerState> for SharedVideoSearch {
    fn from_ref(input: &ServerState) -> Self {
        input.video_search.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedMoodVault {
    fn from_ref(input: &ServerState) -> Self {
        input.mood_vault.clone()
    }
}
