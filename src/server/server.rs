use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::info;

use super::arrangement_routes::arrangement_routes;
use super::auth_routes::auth_routes;
use super::category_routes::category_routes;
use super::metrics::metrics_handler;
use super::session::Session;
use super::setlist_routes::setlist_routes;
use super::song_routes::song_routes;
use super::state::*;
use super::sync_routes::sync_routes;
use super::user_routes::user_routes;
use super::{http_cache, log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

impl ServerState {
    fn new(
        config: ServerConfig,
        songbook: GuardedSongbookStore,
        user_manager: GuardedUserManager,
        sync_processor: GuardedSyncProcessor,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            songbook,
            user_manager,
            sync_processor,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    songbook: GuardedSongbookStore,
    user_manager: GuardedUserManager,
    sync_processor: GuardedSyncProcessor,
) -> Router {
    let state = ServerState::new(config.clone(), songbook, user_manager, sync_processor);

    // Category pages are derived data, safe to cache for a while.
    let cached_routes = category_routes().layer(middleware::from_fn_with_state(
        config.content_cache_age_sec,
        http_cache,
    ));

    let api_routes: Router<ServerState> = Router::new()
        .merge(auth_routes())
        .merge(song_routes())
        .merge(arrangement_routes())
        .merge(cached_routes)
        .merge(user_routes())
        .merge(setlist_routes())
        .merge(sync_routes());

    let app = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            api_routes.fallback_service(static_files_service)
        }
        None => api_routes.route("/", get(home)),
    };

    app.layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    songbook: GuardedSongbookStore,
    user_manager: GuardedUserManager,
    sync_processor: GuardedSyncProcessor,
    metrics_port: u16,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, songbook, user_manager, sync_processor);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let api = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    let metrics = axum::serve(metrics_listener, make_metrics_app());

    tokio::try_join!(
        async { api.await.context("HTTP server failed") },
        async { metrics.await.context("Metrics server failed") },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::songbook::SqliteSongbookStore;
    use crate::sync::{SqliteSyncRecordStore, SyncProcessor, DEFAULT_MAX_BATCH_SIZE};
    use crate::user::{SqliteUserStore, UserManager};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app(dir: &TempDir) -> Router {
        let songbook: GuardedSongbookStore =
            Arc::new(SqliteSongbookStore::new(dir.path().join("songbook.db")).unwrap());
        let user_store = Arc::new(SqliteUserStore::new(dir.path().join("user.db")).unwrap());
        let user_manager = Arc::new(UserManager::new(user_store));
        let records = Arc::new(SqliteSyncRecordStore::new(dir.path().join("sync.db")).unwrap());
        let sync_processor = Arc::new(SyncProcessor::new(
            songbook.clone(),
            user_manager.clone(),
            records,
            DEFAULT_MAX_BATCH_SIZE,
        ));
        make_app(
            ServerConfig::default(),
            songbook,
            user_manager,
            sync_processor,
        )
    }

    #[test]
    fn formats_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0d 00:00:59");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 03:04:05"
        );
    }

    #[tokio::test]
    async fn responds_forbidden_on_protected_routes() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let protected_routes = vec![
            ("GET", "/v1/songs"),
            ("GET", "/v1/songs/123"),
            ("GET", "/v1/songs/search?q=grace"),
            ("GET", "/v1/songs/123/comments"),
            ("GET", "/v1/arrangements/123"),
            ("GET", "/v1/arrangements/123/chart"),
            ("GET", "/v1/categories"),
            ("GET", "/v1/user/favorites/songs"),
            ("GET", "/v1/user/profile"),
            ("GET", "/v1/user/setlists"),
            ("GET", "/v1/users/someone"),
            ("GET", "/v1/auth/logout"),
            ("GET", "/v1/auth/session"),
            ("POST", "/v1/songs/123/view"),
        ];

        for (method, route) in protected_routes.into_iter() {
            let request = Request::builder()
                .method(method)
                .uri(route)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", route);
        }
    }

    #[tokio::test]
    async fn home_serves_stats() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(stats["uptime"].as_str().unwrap().starts_with("0d"));
        assert!(stats["session_token"].is_null());
    }

    #[tokio::test]
    async fn unknown_private_setlist_is_not_found_anonymously() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let request = Request::builder()
            .uri("/v1/setlists/nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
