use anyhow::Result;
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tracing::{debug, error, warn};

use crate::classifier::{decode_capture, EmotionLabel, MoodAsset};
use crate::error::PipelineError;
use crate::moodtable::{MoodBucket, MoodTable, SongRecord};
use crate::user::auth::AuthTokenValue;
use crate::user::{UserManager, UserStore};
use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::State,
    http::{header, response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
#[cfg(test)]
use tower::ServiceExt; // for `oneshot`

use crate::search::VideoResult;

use super::mood_vault::MoodVault;
use super::session::{
    MoodKey, Session, COOKIE_MOOD_SESSION_KEY, COOKIE_SESSION_TOKEN_KEY,
};
use super::{log_requests, state::*, RequestsLoggingLevel, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub logged_in_as: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct RegisterBody {
    pub username: String,
    pub password: String,
    pub password_repeat: String,
}

#[derive(Deserialize)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
    name: String,
}

#[derive(Deserialize, Debug)]
struct CaptureBody {
    /// base64 data-URI of the webcam snapshot.
    pub image: String,
}

#[derive(Serialize)]
struct CaptureResponse {
    detected: bool,
    name: String,
    mood: Option<EmotionLabel>,
    emoji_path: Option<&'static str>,
    error_message: Option<String>,
}

#[derive(Serialize)]
struct SongsResponse {
    name: String,
    mood: EmotionLabel,
    songs: Vec<SongRecord>,
}

#[derive(Serialize)]
struct VideosResponse {
    name: String,
    mood: EmotionLabel,
    media: MoodAsset,
    results: Vec<VideoResult>,
}

#[derive(Serialize)]
struct ErrorDetails {
    name: String,
    error_message: String,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        logged_in_as: session.map(|s| s.handle),
    };
    Json(stats)
}

async fn get_error(key: MoodKey) -> impl IntoResponse {
    Json(ErrorDetails {
        name: key.display_name,
        error_message: "Could not analyze the capture. Please try again.".to_string(),
    })
}

fn lookup_mood(state: &ServerState, key: &MoodKey) -> Option<EmotionLabel> {
    let token = key.token.as_ref()?;
    state.mood_vault.lock().unwrap().get(token)
}

async fn post_capture(
    key: MoodKey,
    State(state): State<ServerState>,
    Json(body): Json<CaptureBody>,
) -> Response {
    let input = match decode_capture(&body.image) {
        Ok(input) => input,
        Err(err) => {
            debug!("Rejecting capture payload: {}", err);
            return Json(CaptureResponse {
                detected: false,
                name: key.display_name,
                mood: None,
                emoji_path: None,
                error_message: Some(err.to_string()),
            })
            .into_response();
        }
    };

    let result = match state.classifier.classify(input).await {
        Ok(result) => result,
        Err(err) => {
            error!("Classification failed: {}", err);
            return Redirect::to("/v1/error").into_response();
        }
    };

    let (token, minted) = match key.token {
        Some(token) => (token, false),
        None => (AuthTokenValue::generate().0, true),
    };
    state.mood_vault.lock().unwrap().set(&token, result.label);

    let asset = MoodAsset::for_label(result.label);
    let mut response = Json(CaptureResponse {
        detected: true,
        name: key.display_name,
        mood: Some(result.label),
        emoji_path: Some(asset.emoji_path),
        error_message: None,
    })
    .into_response();

    if minted {
        let cookie_value = HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly",
            COOKIE_MOOD_SESSION_KEY, token
        ))
        .unwrap();
        response
            .headers_mut()
            .insert(header::SET_COOKIE, cookie_value);
    }
    response
}

/// Revisiting the capture page drops the previously detected mood.
async fn get_capture(key: MoodKey, State(state): State<ServerState>) -> Response {
    if let Some(token) = key.token.as_ref() {
        state.mood_vault.lock().unwrap().clear(token);
    }
    Json(CaptureResponse {
        detected: false,
        name: key.display_name,
        mood: None,
        emoji_path: None,
        error_message: None,
    })
    .into_response()
}

async fn get_songs(key: MoodKey, State(state): State<ServerState>) -> Response {
    let label = match lookup_mood(&state, &key) {
        Some(label) => label,
        None => return Redirect::to("/v1/mood/capture").into_response(),
    };

    let sample_size = state.config.song_sample_size;
    let songs = match state
        .mood_table
        .sample(label, sample_size, &mut rand::rng())
    {
        Ok(songs) => songs,
        Err(PipelineError::InsufficientData { wanted, available }) => {
            warn!(
                "Mood bucket holds {} songs but {} were requested, returning them all",
                available, wanted
            );
            state
                .mood_table
                .bucket_songs(MoodBucket::for_label(label))
                .into_iter()
                .cloned()
                .collect()
        }
        Err(err) => {
            error!("Song sampling failed: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Json(SongsResponse {
        name: key.display_name,
        mood: label,
        songs,
    })
    .into_response()
}

async fn get_videos(key: MoodKey, State(state): State<ServerState>) -> Response {
    let label = match lookup_mood(&state, &key) {
        Some(label) => label,
        None => return Redirect::to("/v1/mood/capture").into_response(),
    };

    // A broken search upstream degrades to an empty result list.
    let results = match state.video_search.search(label).await {
        Ok(results) => results,
        Err(err) => {
            warn!("Video search failed: {}", err);
            vec![]
        }
    };

    Json(VideosResponse {
        name: key.display_name,
        mood: label,
        media: MoodAsset::for_label(label),
        results,
    })
    .into_response()
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<RegisterBody>,
) -> Response {
    if body.username.is_empty() {
        return (StatusCode::BAD_REQUEST, "The username cannot be empty.").into_response();
    }
    if body.password != body.password_repeat {
        return (StatusCode::BAD_REQUEST, "Password does not match.").into_response();
    }

    let locked_manager = user_manager.lock().unwrap();
    match locked_manager.register(&body.username, &body.password) {
        Ok(user_id) => {
            debug!("Registered user {} with id {}", body.username, user_id);
            StatusCode::CREATED.into_response()
        }
        Err(err) if err.to_string() == "Username already exists." => {
            (StatusCode::CONFLICT, "Username already exists.").into_response()
        }
        Err(err) => {
            error!("Registration failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    let locked_manager = user_manager.lock().unwrap();
    match locked_manager.login(&body.username, &body.password) {
        Ok(Some(auth_token)) => {
            let response_body = LoginSuccessResponse {
                token: auth_token.value.0.clone(),
                name: body.username.clone(),
            };
            let response_body = serde_json::to_string(&response_body).unwrap();

            let cookie_value = HeaderValue::from_str(&format!(
                "{}={}; Path=/; HttpOnly",
                COOKIE_SESSION_TOKEN_KEY, auth_token.value.0
            ))
            .unwrap();
            response::Builder::new()
                .status(StatusCode::CREATED)
                .header(header::SET_COOKIE, cookie_value)
                .body(Body::from(response_body))
                .unwrap()
        }
        Ok(None) => (StatusCode::FORBIDDEN, "Invalid username or password.").into_response(),
        Err(err) => {
            error!("Login failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    let locked_manager = user_manager.lock().unwrap();
    match locked_manager.delete_auth_token(session.user_id, &AuthTokenValue(session.token)) {
        Ok(()) => {
            let cookie_value = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            response::Builder::new()
                .status(StatusCode::OK)
                .header(header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

impl ServerState {
    fn new(
        config: ServerConfig,
        mood_table: MoodTable,
        classifier: SharedEmotionClassifier,
        video_search: SharedVideoSearch,
        user_manager: UserManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            classifier,
            mood_table: Arc::new(mood_table),
            video_search,
            user_manager: Arc::new(Mutex::new(user_manager)),
            mood_vault: Arc::new(Mutex::new(MoodVault::default())),
        }
    }
}

fn make_app(
    config: ServerConfig,
    mood_table: MoodTable,
    classifier: SharedEmotionClassifier,
    video_search: SharedVideoSearch,
    user_store: Box<dyn UserStore>,
) -> Result<Router> {
    let user_manager = UserManager::new(user_store);
    let state = ServerState::new(
        config.clone(),
        mood_table,
        classifier,
        video_search,
        user_manager,
    );

    let auth_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let mood_routes: Router = Router::new()
        .route("/capture", post(post_capture))
        .route("/capture", get(get_capture))
        .route("/songs", get(get_songs))
        .route("/videos", get(get_videos))
        .with_state(state.clone());

    let mut app: Router = Router::new()
        .route("/", get(home))
        .route("/v1/error", get(get_error))
        .with_state(state.clone())
        .nest("/v1/auth", auth_routes)
        .nest("/v1/mood", mood_routes);

    if let Some(assets_path) = config.assets_dir_path {
        app = app.nest_service("/assets", ServeDir::new(assets_path));
    }

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    mood_table: MoodTable,
    classifier: SharedEmotionClassifier,
    video_search: SharedVideoSearch,
    user_store: Box<dyn UserStore>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    assets_dir_path: Option<String>,
    song_sample_size: usize,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        assets_dir_path,
        song_sample_size,
    };
    let app = make_app(config, mood_table, classifier, video_search, user_store)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FixedEmotionClassifier, UnavailableEmotionClassifier};
    use crate::search::NoOpVideoSearch;
    use crate::user::SqliteUserStore;
    use axum::body::to_bytes;
    use axum::http::Request;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{ImageBuffer, Luma};
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn energetic_table(count: usize) -> MoodTable {
        let songs = (0..count)
            .map(|i| SongRecord {
                id: i,
                name: format!("song-{}", i),
                album: format!("album-{}", i),
                artist: format!("artist-{}", i),
                mood: MoodBucket::Energetic,
            })
            .collect();
        MoodTable::from_songs(songs)
    }

    fn make_test_app(
        classifier: SharedEmotionClassifier,
        mood_table: MoodTable,
    ) -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let user_store = Box::new(SqliteUserStore::new(temp_dir.path().join("user.db")).unwrap());
        let app = make_app(
            ServerConfig::default(),
            mood_table,
            classifier,
            Arc::new(NoOpVideoSearch),
            user_store,
        )
        .unwrap();
        (app, temp_dir)
    }

    fn png_data_url() -> String {
        let img = ImageBuffer::from_pixel(4, 4, Luma([128u8]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(&bytes))
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// "name=value; Path=/; ..." -> "name=value"
    fn cookie_pair(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("No Set-Cookie header")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn responds_forbidden_on_logout_without_session() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        let request = Request::builder()
            .uri("/v1/auth/logout")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn songs_and_videos_redirect_without_a_captured_mood() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        for uri in ["/v1/mood/songs", "/v1/mood/videos"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(
                response.headers().get(header::LOCATION).unwrap(),
                "/v1/mood/capture"
            );
        }
    }

    #[tokio::test]
    async fn register_validates_passwords_and_duplicates() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        let mismatched = json!({
            "username": "alice",
            "password": "pw1",
            "password_repeat": "pw2",
        });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/auth/register", &mismatched))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Password does not match.");

        let valid = json!({
            "username": "alice",
            "password": "pw1",
            "password_repeat": "pw1",
        });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/auth/register", &valid))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/auth/register", &valid))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_text(response).await, "Username already exists.");
    }

    #[tokio::test]
    async fn anonymous_capture_flow_serves_songs_and_videos() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        let capture = json!({ "image": png_data_url() });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/mood/capture", &capture))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = cookie_pair(&response);
        assert!(cookie.starts_with("mood_session="));

        let body = body_json(response).await;
        assert_eq!(body["detected"], json!(true));
        assert_eq!(body["name"], json!("Guest"));
        assert_eq!(body["mood"], json!("Happy"));
        assert_eq!(body["emoji_path"], json!("emojis/happy.png"));

        let request = Request::builder()
            .uri("/v1/mood/songs")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["mood"], json!("Happy"));
        let songs = body["songs"].as_array().unwrap();
        assert_eq!(songs.len(), 10);
        let distinct_ids: HashSet<u64> = songs.iter().map(|s| s["id"].as_u64().unwrap()).collect();
        assert_eq!(distinct_ids.len(), 10);

        let request = Request::builder()
            .uri("/v1/mood/videos")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["mood"], json!("Happy"));
        assert_eq!(body["media"]["video_path"], json!("videos/happy.mp4"));
        assert_eq!(body["media"]["emoji_path"], json!("emojis/happy.png"));
        assert_eq!(body["results"], json!([]));
    }

    #[tokio::test]
    async fn small_mood_bucket_is_served_whole() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(3),
        );

        let capture = json!({ "image": png_data_url() });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/mood/capture", &capture))
            .await
            .unwrap();
        let cookie = cookie_pair(&response);

        let request = Request::builder()
            .uri("/v1/mood/songs")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["songs"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn invalid_capture_payload_is_reported() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        let capture = json!({ "image": "definitely not a data uri" });
        let response = app
            .oneshot(json_request("POST", "/v1/mood/capture", &capture))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["detected"], json!(false));
        assert!(body["error_message"].is_string());
    }

    #[tokio::test]
    async fn classifier_failure_redirects_to_the_error_page() {
        let (app, _temp_dir) =
            make_test_app(Arc::new(UnavailableEmotionClassifier), energetic_table(12));

        let capture = json!({ "image": png_data_url() });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/mood/capture", &capture))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/v1/error"
        );

        let request = Request::builder()
            .uri("/v1/error")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["error_message"].is_string());
    }

    #[tokio::test]
    async fn revisiting_capture_clears_the_mood() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        let capture = json!({ "image": png_data_url() });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/mood/capture", &capture))
            .await
            .unwrap();
        let cookie = cookie_pair(&response);

        let request = Request::builder()
            .uri("/v1/mood/capture")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/v1/mood/songs")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn login_flow_with_session_cookie() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        let register = json!({
            "username": "alice",
            "password": "correct horse",
            "password_repeat": "correct horse",
        });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/auth/register", &register))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let wrong = json!({ "username": "alice", "password": "wrong" });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/auth/login", &wrong))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "Invalid username or password.");

        let right = json!({ "username": "alice", "password": "correct horse" });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/auth/login", &right))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = cookie_pair(&response);
        assert!(cookie.starts_with("session_token="));
        let body = body_json(response).await;
        assert_eq!(body["token"].as_str().unwrap().len(), 64);
        assert_eq!(body["name"], json!("alice"));

        // A logged-in capture is keyed by the auth token and shows the handle.
        let capture = json!({ "image": png_data_url() });
        let mut request = json_request("POST", "/v1/mood/capture", &capture);
        request
            .headers_mut()
            .insert("cookie", HeaderValue::from_str(&cookie).unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        // No anonymous cookie is minted for an authenticated session.
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["name"], json!("alice"));

        let request = Request::builder()
            .uri("/v1/auth/logout")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The token is gone, a second logout is rejected.
        let request = Request::builder()
            .uri("/v1/auth/logout")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn home_reports_the_session_handle() {
        let (app, _temp_dir) = make_test_app(
            Arc::new(FixedEmotionClassifier(EmotionLabel::Happy)),
            energetic_table(12),
        );

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["logged_in_as"].is_null());

        let register = json!({
            "username": "bob",
            "password": "pw",
            "password_repeat": "pw",
        });
        app.clone()
            .oneshot(json_request("POST", "/v1/auth/register", &register))
            .await
            .unwrap();
        let login = json!({ "username": "bob", "password": "pw" });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/v1/auth/login", &login))
            .await
            .unwrap();
        let cookie = cookie_pair(&response);

        let request = Request::builder()
            .uri("/")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["logged_in_as"], json!("bob"));
    }
}
