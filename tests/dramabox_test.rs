//! Dramabox API client tests
//!
//! Mapping of upstream books and episodes, fail-soft behaviour and the
//! response cache.

use std::time::Duration;

use dracin::api::DramaboxClient;
use dracin::models::{StreamType, DEFAULT_YEAR};
use mockito::{Matcher, Server};

const BOOKS: &str = r#"[
    {
        "bookId": "41000102345",
        "bookName": "The CEO's Hidden Wife",
        "coverWap": "https://img.example/ceo-wap.jpg",
        "cover": "https://img.example/ceo.jpg",
        "introduction": "A contract marriage turns real.",
        "chapterCount": 80,
        "playCount": "12.5K",
        "tags": ["Romance", "CEO"]
    },
    {
        "bookId": 41000100001,
        "bookName": "Revenge of the Heiress",
        "cover": "https://img.example/heiress.jpg",
        "chapterCount": 60,
        "playCount": "3M"
    }
]"#;

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_maps_books() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/dramabox/search")
        .match_query(Matcher::UrlEncoded("query".into(), "ceo wife".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(BOOKS)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    let page = client.search("ceo wife", 1).await;

    mock.assert_async().await;

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.total_items, 2);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_more);

    assert_eq!(page.data[0].id, "41000102345");
    assert_eq!(page.data[0].slug, "41000102345");
    assert_eq!(page.data[0].title, "The CEO's Hidden Wife");
    // Search prefers the full cover over the wap cover
    assert_eq!(page.data[0].poster, "https://img.example/ceo.jpg");
    assert_eq!(page.data[0].year, DEFAULT_YEAR);

    // Numeric ids are accepted
    assert_eq!(page.data[1].id, "41000100001");
}

#[tokio::test]
async fn test_search_non_array_body_is_empty() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/dramabox/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"message": "rate limited"}"#)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    let page = client.search("anything", 1).await;

    assert!(page.data.is_empty());
    assert_eq!(page.total_items, 0);
}

#[tokio::test]
async fn test_search_error_status_is_empty() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/dramabox/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    assert!(client.search("ceo", 1).await.data.is_empty());
}

#[tokio::test]
async fn test_search_unreachable_upstream_is_empty() {
    // Nothing listens on this port
    let client = DramaboxClient::with_base_url("http://127.0.0.1:9");
    assert!(client.search("ceo", 1).await.data.is_empty());
}

#[tokio::test]
async fn test_search_raw_passes_status() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/dramabox/search")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    let upstream = client.search_raw("ceo").await.unwrap();

    assert_eq!(upstream.status.as_u16(), 429);
    assert!(upstream.body.is_none());
}

// =============================================================================
// Home
// =============================================================================

#[tokio::test]
async fn test_home_sections() {
    let mut server = Server::new_async().await;

    let foryou = r#"[
        { "bookId": "1", "bookName": "Banner One", "cover": "https://img.example/1.jpg", "tags": ["Romance"] },
        { "tagCardVo": { "tagBooks": [ { "bookId": "2", "bookName": "Nested Banner" } ] } },
        { "unrelated": true }
    ]"#;

    let trending: Vec<String> = (1..=12)
        .map(|i| format!(r#"{{"bookId": "t{i}", "bookName": "Trend {i}"}}"#))
        .collect();
    let trending = format!("[{}]", trending.join(","));

    let _foryou = server
        .mock("GET", "/api/dramabox/foryou")
        .with_status(200)
        .with_body(foryou)
        .create_async()
        .await;
    let _latest = server
        .mock("GET", "/api/dramabox/latest")
        .with_status(200)
        .with_body(BOOKS)
        .create_async()
        .await;
    let _trending = server
        .mock("GET", "/api/dramabox/trending")
        .with_status(200)
        .with_body(trending)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    let home = client.home().await;

    assert_eq!(home.banners.len(), 2);
    assert_eq!(home.banners[0].title, "Banner One");
    assert_eq!(home.banners[0].link, "/drama/1");
    assert_eq!(home.banners[0].subtitle, "Romance");
    assert_eq!(home.banners[1].id, "2");

    assert_eq!(home.trending.len(), 10);
    assert_eq!(home.top_today.len(), 5);
    assert_eq!(home.top_today[0].id, "t1");
    assert_eq!(home.top_week.len(), 5);
    assert_eq!(home.top_week[0].id, "t6");

    assert_eq!(home.latest.len(), 2);
    assert_eq!(home.latest[0].episode.number, 80);
    assert_eq!(home.latest[0].episode.title.as_deref(), Some("Episode 80"));
    assert_eq!(home.latest[0].drama.views, 125_000);

    assert!(!home.genres.is_empty());
}

#[tokio::test]
async fn test_home_unreachable_is_empty() {
    let client = DramaboxClient::with_base_url("http://127.0.0.1:9");
    let home = client.home().await;
    assert!(home.is_empty());
}

// =============================================================================
// Drama & Episodes
// =============================================================================

#[tokio::test]
async fn test_drama_found_in_feeds() {
    let mut server = Server::new_async().await;

    let _foryou = server
        .mock("GET", "/api/dramabox/foryou")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let _latest = server
        .mock("GET", "/api/dramabox/latest")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let _trending = server
        .mock("GET", "/api/dramabox/trending")
        .with_status(200)
        .with_body(BOOKS)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());

    let drama = client.drama("41000102345").await;
    assert_eq!(drama.title, "The CEO's Hidden Wife");
    assert_eq!(drama.poster, "https://img.example/ceo-wap.jpg");
    assert_eq!(drama.backdrop, "https://img.example/ceo.jpg");
    assert_eq!(drama.total_episodes, 80);
    assert_eq!(drama.genre_names(), "Romance, CEO");

    // Unknown ids fall back to a stub
    let unknown = client.drama("999").await;
    assert_eq!(unknown.id, "999");
    assert_eq!(unknown.title, "Drama 999");
    assert_eq!(unknown.total_episodes, 0);
}

#[tokio::test]
async fn test_episodes_mapping() {
    let mut server = Server::new_async().await;

    let body = r#"[
        {
            "chapterId": "c1",
            "chapterIndex": 0,
            "chapterName": "EP 1",
            "cdnList": [
                {
                    "cdnDomain": "cdn-a",
                    "videoPathList": [
                        { "quality": 540, "videoPath": "https://cdn-a/1-540.mp4" },
                        { "quality": 1080, "videoPath": "https://cdn-a/1-1080.m3u8" }
                    ]
                },
                {
                    "cdnDomain": "cdn-b",
                    "videoPathList": [
                        { "quality": 720, "videoPath": "https://cdn-b/1-720.mp4" }
                    ]
                }
            ]
        },
        { "chapterId": 2002, "chapterIndex": 1 },
        { "garbage": true }
    ]"#;

    let mock = server
        .mock("GET", "/api/dramabox/allepisode")
        .match_query(Matcher::UrlEncoded("bookId".into(), "41000102345".into()))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    let episodes = client.episodes("41000102345").await.unwrap();

    mock.assert_async().await;

    assert_eq!(episodes.len(), 2);

    let first = &episodes[0];
    assert_eq!(first.id, "c1");
    assert_eq!(first.drama_id, "41000102345");
    assert_eq!(first.number, 1);
    assert_eq!(first.title.as_deref(), Some("EP 1"));
    assert_eq!(first.servers.len(), 3);
    assert!(first.servers[1].url.ends_with(".m3u8"));
    assert_eq!(first.servers[1].stream_type, StreamType::Mp4);
    assert_eq!(first.servers[2].label(), "cdn-b (720p) (720p)");
    // First 720p or 1080p server wins
    assert_eq!(first.stream_url.as_deref(), Some("https://cdn-a/1-1080.m3u8"));

    let second = &episodes[1];
    assert_eq!(second.id, "2002");
    assert_eq!(second.number, 2);
    assert_eq!(second.title.as_deref(), Some("Episode 2"));
    assert!(second.servers.is_empty());
    assert!(second.stream_url.is_none());
}

#[tokio::test]
async fn test_episodes_error_status_is_empty() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/dramabox/allepisode")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    assert!(client.episodes("1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_episodes_unreachable_is_error() {
    let client = DramaboxClient::with_base_url("http://127.0.0.1:9");
    assert!(client.episodes("1").await.is_err());
}

// =============================================================================
// Listings & Cache
// =============================================================================

#[tokio::test]
async fn test_genre_listing_is_single_page() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/dramabox/trending")
        .with_status(200)
        .with_body(BOOKS)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    let page = client.dramas_by_genre("romance", 2).await.unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_more);
    assert_eq!(page.data.len(), 2);
}

#[tokio::test]
async fn test_responses_are_cached() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/dramabox/trending")
        .with_status(200)
        .with_body(BOOKS)
        .expect(1)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    client.trending(1).await.unwrap();
    client.trending(1).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_zero_revalidate_disables_cache() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/dramabox/latest")
        .with_status(200)
        .with_body(BOOKS)
        .expect(2)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url()).with_revalidate(Duration::ZERO);
    client.latest(1).await.unwrap();
    client.latest(1).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_responses_are_not_cached() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/dramabox/trending")
        .with_status(502)
        .expect(2)
        .create_async()
        .await;

    let client = DramaboxClient::with_base_url(server.url());
    assert!(client.trending(1).await.unwrap().data.is_empty());
    assert!(client.trending(1).await.unwrap().data.is_empty());

    mock.assert_async().await;
}
