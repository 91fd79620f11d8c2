//! Video uploads through the fake backend.

mod common;

use common::{fake_video_bytes, upload_form, TestHarness};
use serde_json::Value;

#[tokio::test]
async fn trimmed_video_reports_effective_window() {
    let (h, addr) = TestHarness::with_server(None).await;
    let data = r#"{"configs":[
        {"tag":"tail","width":640,"height":360,"codec":"libx264","end":-2,"bitrate":800},
        {"tag":"webm","width":320,"height":180,"codec":"libvpx","mute":true,"bitrate":500}
    ]}"#;
    let form = upload_form("videos", data, vec![("clip.mp4", "video/mp4", fake_video_bytes())]);

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/videos"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    let group = &json["groups"][0];
    assert_eq!(group["status"], "success");

    let videos = group["videos"].as_array().unwrap();
    let tail = videos.iter().find(|v| v["tag"] == "tail").unwrap();
    assert_eq!(tail["start"], 0.0);
    assert_eq!(tail["end"], 8.0);
    assert_eq!(tail["duration"], 8.0);
    assert_eq!(tail["frame_rate"], 30);
    assert_eq!(tail["codec"], "libx264");
    assert_eq!(tail["bitrate"], 800);
    assert_eq!(tail["mute"], false);
    assert_eq!(tail["audio_sample_rate"], 44100);

    let webm = videos.iter().find(|v| v["tag"] == "webm").unwrap();
    assert_eq!(webm["bitrate"], Value::Null);
    assert_eq!(webm["mute"], true);
    assert_eq!(webm["audio_sample_rate"], Value::Null);

    let id = group["id"].as_str().unwrap();
    let resp = reqwest::get(format!("http://{addr}/videos/{id}/tail")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
    let body = resp.bytes().await.unwrap();
    assert!(body.ends_with(b"tail:0-8"));

    assert_eq!(h.count("medcord_video_groups"), 1);
    assert_eq!(h.count("medcord_videos"), 2);
}

#[tokio::test]
async fn spooled_uploads_are_removed() {
    let (h, addr) = TestHarness::with_server(None).await;
    let data = r#"{"configs":[{"tag":"small","width":160,"height":90,"codec":"libtheora"}]}"#;
    let form = upload_form(
        "videos",
        data,
        vec![
            ("a.mp4", "video/mp4", fake_video_bytes()),
            ("b.mp4", "video/mp4", b"garbage".to_vec()),
        ],
    );

    let json: Value = reqwest::Client::new()
        .post(format!("http://{addr}/videos"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let statuses: Vec<_> = json["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, ["success", "error"]);

    let leftovers = std::fs::read_dir(h.temp_dir()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn delete_video_group() {
    let (h, addr) = TestHarness::with_server(None).await;
    let client = reqwest::Client::new();
    let data = r#"{"configs":[{"tag":"v","width":64,"height":64,"codec":"libmpeg4"}]}"#;
    let form = upload_form("videos", data, vec![("a.mp4", "video/mp4", fake_video_bytes())]);

    let json: Value = client
        .post(format!("http://{addr}/videos"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = json["groups"][0]["id"].as_str().unwrap().to_string();

    let resp = client.delete(format!("http://{addr}/videos/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), 204);
    assert_eq!(h.count("medcord_video_groups"), 0);

    let resp = client.delete(format!("http://{addr}/videos/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}
