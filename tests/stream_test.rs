//! Range-aware blob retrieval over HTTP.

mod common;

use common::TestHarness;
use mc_core::GroupId;

/// Store a 1000-byte blob that sniffs as PNG and return its group id.
async fn stored_blob(h: &TestHarness) -> (GroupId, Vec<u8>) {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend((0..992u32).map(|i| (i % 251) as u8));
    let group = GroupId::new();
    h.ctx
        .orchestrator
        .image_store()
        .write(group, "original", &data)
        .await
        .unwrap();
    (group, data)
}

async fn get_range(addr: std::net::SocketAddr, group: GroupId, range: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("http://{addr}/images/{group}/original"))
        .header("range", range)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn leading_range_is_partial_content() {
    let (h, addr) = TestHarness::with_server(None).await;
    let (group, data) = stored_blob(&h).await;

    let resp = get_range(addr, group, "bytes=0-99").await;
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 0-99/1000");
    assert_eq!(resp.headers()["content-length"], "100");
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[..100]);
}

#[tokio::test]
async fn overlong_range_is_clamped() {
    let (h, addr) = TestHarness::with_server(None).await;
    let (group, data) = stored_blob(&h).await;

    let resp = get_range(addr, group, "bytes=900-2000").await;
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 900-999/1000");
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &data[900..]);
}

#[tokio::test]
async fn open_ended_range_runs_to_end() {
    let (h, addr) = TestHarness::with_server(None).await;
    let (group, data) = stored_blob(&h).await;

    let resp = get_range(addr, group, "bytes=990-").await;
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 990-999/1000");
    assert_eq!(&resp.bytes().await.unwrap()[..], &data[990..]);
}

#[tokio::test]
async fn range_past_end_is_empty_partial() {
    let (h, addr) = TestHarness::with_server(None).await;
    let (group, _) = stored_blob(&h).await;

    let resp = get_range(addr, group, "bytes=5000-").await;
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes */1000");
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_ranges_are_416() {
    let (h, addr) = TestHarness::with_server(None).await;
    let (group, _) = stored_blob(&h).await;

    for range in ["bytes=abc", "bytes=-100", "bytes=0-1,5-9", "items=0-1"] {
        let resp = get_range(addr, group, range).await;
        assert_eq!(resp.status(), 416, "{range}");
    }
}

#[tokio::test]
async fn head_returns_headers_only() {
    let (h, addr) = TestHarness::with_server(None).await;
    let (group, _) = stored_blob(&h).await;

    let resp = reqwest::Client::new()
        .head(format!("http://{addr}/images/{group}/original"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-length"], "1000");
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_blob_is_404_even_with_range() {
    let (_h, addr) = TestHarness::with_server(None).await;
    let resp = get_range(addr, GroupId::new(), "bytes=0-10").await;
    assert_eq!(resp.status(), 404);
}
