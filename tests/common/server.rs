//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases.

use super::constants::*;
use super::fixtures::{create_test_users, seed_songbook, SeededSongbook};
use songbook_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use songbook_server::songbook::{SongbookStore, SqliteSongbookStore};
use songbook_server::sync::{SqliteSyncRecordStore, SyncProcessor};
use songbook_server::user::{SqliteUserStore, UserManager};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Sync batch limit used by test servers, small enough to exercise.
pub const TEST_MAX_BATCH_SIZE: usize = 10;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    #[allow(dead_code)]
    pub port: u16,

    /// Ids of the seeded users and content
    #[allow(dead_code)]
    pub seeded: SeededSongbook,

    /// Songbook store for direct database access in tests
    #[allow(dead_code)]
    pub songbook: Arc<dyn SongbookStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with registration enabled
    pub async fn spawn() -> Self {
        Self::spawn_with_registration(true).await
    }

    /// Spawns a new test server on a random port
    ///
    /// This function:
    /// 1. Creates temporary databases with test users and seeded songs
    /// 2. Binds to a random port (127.0.0.1:0)
    /// 3. Spawns the server in a background task
    /// 4. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if database creation fails, the port cannot be bound or the
    /// server doesn't become ready within timeout.
    pub async fn spawn_with_registration(allow_registration: bool) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");

        let user_db_path = temp_db_dir.path().join("user.db");
        let (test_user_id, admin_id) =
            create_test_users(&user_db_path).expect("Failed to create test users");

        let songbook_store = SqliteSongbookStore::new(temp_db_dir.path().join("songbook.db"))
            .expect("Failed to open songbook store");
        let seeded = seed_songbook(&songbook_store, test_user_id, admin_id)
            .expect("Failed to seed songbook");
        let songbook: Arc<dyn SongbookStore> = Arc::new(songbook_store);

        let user_store =
            Arc::new(SqliteUserStore::new(&user_db_path).expect("Failed to open user store"));
        let user_manager = Arc::new(UserManager::new(user_store));

        let records = Arc::new(
            SqliteSyncRecordStore::new(temp_db_dir.path().join("sync.db"))
                .expect("Failed to open sync store"),
        );
        let sync_processor = Arc::new(SyncProcessor::new(
            songbook.clone(),
            user_manager.clone(),
            records,
            TEST_MAX_BATCH_SIZE,
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            content_cache_age_sec: 0, // Disable caching in tests
            frontend_dir_path: None,
            allow_registration,
        };

        let app = make_app(config, songbook.clone(), user_manager, sync_processor);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            seeded,
            songbook,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
