//! End-to-end tests for category browsing

mod common;

use common::{TestClient, TestServer, SONG_1_TITLE, SONG_2_TITLE, SONG_3_TITLE};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn category<'a>(categories: &'a [Value], slug: &str) -> &'a Value {
    categories
        .iter()
        .find(|c| c["slug"] == slug)
        .unwrap_or_else(|| panic!("category {} missing", slug))
}

fn titles(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_list_categories_counts_matching_songs() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.list_categories().await;
    assert_eq!(response.status(), StatusCode::OK);
    let categories: Vec<Value> = response.json().await.unwrap();

    // Every category is listed, even empty ones
    assert_eq!(category(&categories, "worship")["song_count"], 0);
    assert_eq!(category(&categories, "kids")["song_count"], 0);

    let christmas = category(&categories, "christmas");
    assert_eq!(christmas["song_count"], 1);
    assert_eq!(christmas["top_songs"][0]["title"], SONG_2_TITLE);

    assert_eq!(category(&categories, "hymns")["song_count"], 1);
    assert_eq!(category(&categories, "salvation")["song_count"], 2);
    assert_eq!(category(&categories, "contemporary")["song_count"], 1);
}

#[tokio::test]
async fn test_category_stats_include_views_and_ratings() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    client.view_song(&server.seeded.song_2_id).await;
    client.view_song(&server.seeded.song_2_id).await;
    client.review_song(&server.seeded.song_2_id, 4, None).await;

    let categories: Vec<Value> = client.list_categories().await.json().await.unwrap();
    let christmas = category(&categories, "christmas");
    assert_eq!(christmas["total_views"], 2);
    assert_eq!(christmas["average_rating"], 4.0);
}

#[tokio::test]
async fn test_category_songs_sorted_by_title() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_category_songs("salvation", "sort=title").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: Value = response.json().await.unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(titles(&page), vec![SONG_1_TITLE, SONG_3_TITLE]);

    // Theme and title keyword both count for Amazing Grace
    let first = &page["items"][0];
    assert_eq!(first["match_score"], 5);

    let page: Value = client
        .get_category_songs("salvation", "sort=title&page=2&limit=1")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&page), vec![SONG_3_TITLE]);
}

#[tokio::test]
async fn test_category_songs_by_rating() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    client.review_song(&server.seeded.song_3_id, 5, None).await;
    client.review_song(&server.seeded.song_1_id, 3, None).await;

    let page: Value = client
        .get_category_songs("salvation", "sort=rating")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&page), vec![SONG_3_TITLE, SONG_1_TITLE]);
}

#[tokio::test]
async fn test_new_song_joins_category_immediately() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .create_song(&json!({
            "title": "O Come O Come Emmanuel",
            "themes": ["advent"]
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let page: Value = client
        .get_category_songs("christmas", "sort=title")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(
        titles(&page),
        vec!["O Come O Come Emmanuel".to_string(), SONG_2_TITLE.to_string()]
    );
}

#[tokio::test]
async fn test_unknown_category_returns_404() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_category_songs("polka", "").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_sort_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_category_songs("hymns", "sort=loudest").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
