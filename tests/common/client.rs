//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for the songbook-server endpoints.
//!
//! When API routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use `authenticated()` or `authenticated_admin()` instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as a regular user
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as an admin user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    pub async fn authenticated_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.get("/").await
    }

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/login",
            &json!({ "user_handle": handle, "password": password }),
        )
        .await
    }

    /// POST /v1/auth/register
    pub async fn register(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/register",
            &json!({ "user_handle": handle, "password": password }),
        )
        .await
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    /// GET /v1/auth/session
    pub async fn get_session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    // ========================================================================
    // Songs
    // ========================================================================

    /// GET /v1/songs?{query}
    pub async fn list_songs(&self, query: &str) -> Response {
        self.get(&format!("/v1/songs?{}", query)).await
    }

    /// POST /v1/songs
    pub async fn create_song(&self, body: &Value) -> Response {
        self.post_json("/v1/songs", body).await
    }

    /// GET /v1/songs/search?q={q}
    pub async fn search_songs(&self, q: &str) -> Response {
        self.client
            .get(self.url("/v1/songs/search"))
            .query(&[("q", q)])
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /v1/songs/{id}
    pub async fn get_song(&self, id: &str) -> Response {
        self.get(&format!("/v1/songs/{}", id)).await
    }

    /// PUT /v1/songs/{id}
    pub async fn update_song(&self, id: &str, body: &Value) -> Response {
        self.put_json(&format!("/v1/songs/{}", id), body).await
    }

    /// DELETE /v1/songs/{id}
    pub async fn delete_song(&self, id: &str) -> Response {
        self.delete(&format!("/v1/songs/{}", id)).await
    }

    /// POST /v1/songs/{id}/view
    pub async fn view_song(&self, id: &str) -> Response {
        self.post_json(&format!("/v1/songs/{}/view", id), &json!({}))
            .await
    }

    /// GET /v1/songs/{id}/arrangements
    pub async fn get_song_arrangements(&self, id: &str) -> Response {
        self.get(&format!("/v1/songs/{}/arrangements", id)).await
    }

    /// GET /v1/songs/{id}/verses
    pub async fn list_verses(&self, song_id: &str) -> Response {
        self.get(&format!("/v1/songs/{}/verses", song_id)).await
    }

    /// POST /v1/songs/{id}/verses
    pub async fn add_verse(&self, song_id: &str, reference: &str, text: &str) -> Response {
        self.post_json(
            &format!("/v1/songs/{}/verses", song_id),
            &json!({ "reference": reference, "text": text }),
        )
        .await
    }

    /// DELETE /v1/songs/{id}/verses/{verse_id}
    pub async fn delete_verse(&self, song_id: &str, verse_id: &str) -> Response {
        self.delete(&format!("/v1/songs/{}/verses/{}", song_id, verse_id))
            .await
    }

    /// GET /v1/songs/{id}/comments
    pub async fn list_comments(&self, song_id: &str) -> Response {
        self.get(&format!("/v1/songs/{}/comments", song_id)).await
    }

    /// POST /v1/songs/{id}/comments
    pub async fn add_comment(&self, song_id: &str, body: &str) -> Response {
        self.post_json(
            &format!("/v1/songs/{}/comments", song_id),
            &json!({ "body": body }),
        )
        .await
    }

    /// DELETE /v1/songs/{id}/comments/{comment_id}
    pub async fn delete_comment(&self, song_id: &str, comment_id: &str) -> Response {
        self.delete(&format!("/v1/songs/{}/comments/{}", song_id, comment_id))
            .await
    }

    /// GET /v1/songs/{id}/reviews
    pub async fn list_song_reviews(&self, song_id: &str) -> Response {
        self.get(&format!("/v1/songs/{}/reviews", song_id)).await
    }

    /// PUT /v1/songs/{id}/reviews
    pub async fn review_song(&self, song_id: &str, rating: u8, comment: Option<&str>) -> Response {
        self.put_json(
            &format!("/v1/songs/{}/reviews", song_id),
            &json!({ "rating": rating, "comment": comment }),
        )
        .await
    }

    /// DELETE /v1/songs/{id}/reviews
    pub async fn delete_song_review(&self, song_id: &str) -> Response {
        self.delete(&format!("/v1/songs/{}/reviews", song_id)).await
    }

    // ========================================================================
    // Arrangements
    // ========================================================================

    /// POST /v1/arrangements
    pub async fn create_arrangement(&self, body: &Value) -> Response {
        self.post_json("/v1/arrangements", body).await
    }

    /// GET /v1/arrangements/{id}?{query}
    pub async fn get_arrangement(&self, id: &str, query: &str) -> Response {
        self.get(&format!("/v1/arrangements/{}?{}", id, query)).await
    }

    /// GET /v1/arrangements/{id}/chart?{query}
    pub async fn get_arrangement_chart(&self, id: &str, query: &str) -> Response {
        self.get(&format!("/v1/arrangements/{}/chart?{}", id, query))
            .await
    }

    /// PUT /v1/arrangements/{id}
    pub async fn update_arrangement(&self, id: &str, body: &Value) -> Response {
        self.put_json(&format!("/v1/arrangements/{}", id), body).await
    }

    /// DELETE /v1/arrangements/{id}
    pub async fn delete_arrangement(&self, id: &str) -> Response {
        self.delete(&format!("/v1/arrangements/{}", id)).await
    }

    /// POST /v1/arrangements/{id}/view
    pub async fn view_arrangement(&self, id: &str) -> Response {
        self.post_json(&format!("/v1/arrangements/{}/view", id), &json!({}))
            .await
    }

    /// GET /v1/arrangements/{id}/reviews
    pub async fn list_arrangement_reviews(&self, id: &str) -> Response {
        self.get(&format!("/v1/arrangements/{}/reviews", id)).await
    }

    /// PUT /v1/arrangements/{id}/reviews
    pub async fn review_arrangement(&self, id: &str, rating: u8) -> Response {
        self.put_json(
            &format!("/v1/arrangements/{}/reviews", id),
            &json!({ "rating": rating }),
        )
        .await
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// GET /v1/categories
    pub async fn list_categories(&self) -> Response {
        self.get("/v1/categories").await
    }

    /// GET /v1/categories/{slug}/songs?{query}
    pub async fn get_category_songs(&self, slug: &str, query: &str) -> Response {
        self.get(&format!("/v1/categories/{}/songs?{}", slug, query))
            .await
    }

    // ========================================================================
    // User
    // ========================================================================

    /// GET /v1/user/favorites/{content_type}
    pub async fn get_favorites(&self, content_type: &str) -> Response {
        self.get(&format!("/v1/user/favorites/{}", content_type))
            .await
    }

    /// POST /v1/user/favorites/{content_type}/{id}
    pub async fn add_favorite(&self, content_type: &str, id: &str) -> Response {
        self.post_json(
            &format!("/v1/user/favorites/{}/{}", content_type, id),
            &json!({}),
        )
        .await
    }

    /// DELETE /v1/user/favorites/{content_type}/{id}
    pub async fn remove_favorite(&self, content_type: &str, id: &str) -> Response {
        self.delete(&format!("/v1/user/favorites/{}/{}", content_type, id))
            .await
    }

    /// GET /v1/user/profile
    pub async fn get_profile(&self) -> Response {
        self.get("/v1/user/profile").await
    }

    /// PUT /v1/user/profile
    pub async fn update_profile(&self, body: &Value) -> Response {
        self.put_json("/v1/user/profile", body).await
    }

    /// GET /v1/users/{handle}
    pub async fn get_public_profile(&self, handle: &str) -> Response {
        self.get(&format!("/v1/users/{}", handle)).await
    }

    // ========================================================================
    // Setlists
    // ========================================================================

    /// GET /v1/user/setlists
    pub async fn list_setlists(&self) -> Response {
        self.get("/v1/user/setlists").await
    }

    /// POST /v1/user/setlists
    pub async fn create_setlist(&self, body: &Value) -> Response {
        self.post_json("/v1/user/setlists", body).await
    }

    /// GET /v1/setlists/{id}
    pub async fn get_setlist(&self, id: &str) -> Response {
        self.get(&format!("/v1/setlists/{}", id)).await
    }

    /// PUT /v1/setlists/{id}
    pub async fn update_setlist(&self, id: &str, body: &Value) -> Response {
        self.put_json(&format!("/v1/setlists/{}", id), body).await
    }

    /// DELETE /v1/setlists/{id}
    pub async fn delete_setlist(&self, id: &str) -> Response {
        self.delete(&format!("/v1/setlists/{}", id)).await
    }

    /// POST /v1/setlists/{id}/entries
    pub async fn add_setlist_entries(&self, id: &str, entries: &Value) -> Response {
        self.post_json(
            &format!("/v1/setlists/{}/entries", id),
            &json!({ "entries": entries }),
        )
        .await
    }

    /// PUT /v1/setlists/{id}/entries/remove
    pub async fn remove_setlist_entries(&self, id: &str, positions: &[usize]) -> Response {
        self.put_json(
            &format!("/v1/setlists/{}/entries/remove", id),
            &json!({ "positions": positions }),
        )
        .await
    }

    /// PUT /v1/setlists/{id}/entries/move
    pub async fn move_setlist_entry(&self, id: &str, from: usize, to: usize) -> Response {
        self.put_json(
            &format!("/v1/setlists/{}/entries/move", id),
            &json!({ "from": from, "to": to }),
        )
        .await
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// POST /v1/sync/batch
    pub async fn sync_batch(&self, operations: &Value) -> Response {
        self.post_json("/v1/sync/batch", &json!({ "operations": operations }))
            .await
    }
}
