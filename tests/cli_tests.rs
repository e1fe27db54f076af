use std::path::Path;
use std::process::{Command, Output};

fn chanpull(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chanpull"))
        .env("CHANPULL_CONFIG_DIR", config_dir)
        .current_dir(config_dir)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn cli_normalize() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("youtube_channels.json"),
        r#"[{"name": "Eddy Kenzo", "id": "UC-eddykenzo", "subscribers": 2760000}]"#,
    )
    .unwrap();

    let out = chanpull(tmp.path(), &["normalize"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Wrote 1 items to youtube_items.json"));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("youtube_items.json")).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!({"items": [{
            "source": "youtube",
            "external_id": "UC-eddykenzo",
            "artist_name": "Eddy Kenzo",
            "subscribers": 2760000
        }]})
    );
}

#[test]
fn cli_normalize_to_stdout() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("mine.json"), "[]").unwrap();

    let out = chanpull(tmp.path(), &["normalize", "-i", "mine.json", "-o", "-"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "{\n  \"items\": []\n}\n");
}

#[test]
fn cli_normalize_rejects_bad_channels() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("youtube_channels.json"),
        r#"[{"name": "Eddy Kenzo", "id": "", "subscribers": 1}]"#,
    )
    .unwrap();

    let out = chanpull(tmp.path(), &["normalize"]);
    assert!(!out.status.success());
    assert!(!tmp.path().join("youtube_items.json").exists());
}

#[test]
fn cli_videos_feed_failure_policy() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("config.toml"),
        r#"
[[feeds]]
name = "Unreachable"
url = "http://127.0.0.1:1/feeds/videos.xml"
"#,
    )
    .unwrap();

    let out = chanpull(tmp.path(), &["videos"]);
    assert!(!out.status.success());
    assert!(!tmp.path().join("youtube_videos.json").exists());

    let out = chanpull(tmp.path(), &["videos", "--skip-failed-feeds"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("youtube_videos.json")).unwrap(),
        "{\n  \"items\": []\n}\n"
    );
}

#[test]
fn cli_push_needs_engine() {
    let tmp = tempfile::tempdir().unwrap();
    let out = chanpull(tmp.path(), &["push"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("No [engine] section in config"));
}

#[test]
fn cli_videos_from_channels_file() {
    use mockito::Matcher;

    let feed_mock = |channel_id: &str, body_file: &str| {
        mockito::mock("GET", "/feeds/videos.xml")
            .match_query(Matcher::UrlEncoded("channel_id".into(), channel_id.into()))
            .with_body_from_file(body_file)
            .create()
    };
    let _m1 = feed_mock("UC-spicediana", "testdata/feed_spice_diana.xml");
    let _m2 = feed_mock("UC-quiet", "testdata/feed_empty.xml");
    let _m3 = feed_mock("UC-spice mirror", "testdata/feed_spice_diana.xml");

    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("config.toml"),
        format!("feed_base = \"{}/feeds/videos.xml\"\n", mockito::server_url()),
    )
    .unwrap();
    std::fs::write(
        tmp.path().join("youtube_channels.json"),
        r#"[
            {"id": "UC-spicediana", "name": "Spice Diana", "subscribers": 1150000},
            {"id": "UC-quiet", "name": "Quiet Channel", "subscribers": 3},
            {"id": "UC-spice mirror", "name": "Spice Mirror", "subscribers": 10}
        ]"#,
    )
    .unwrap();

    let out = chanpull(tmp.path(), &["videos"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Wrote 4 videos from 3 channels"));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("youtube_videos.json")).unwrap()).unwrap();
    let items = written["items"].as_array().unwrap();
    let got: Vec<(&str, &str)> = items
        .iter()
        .map(|i| (i["channel"].as_str().unwrap(), i["external_id"].as_str().unwrap()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("Spice Diana", "sd-video-0002"),
            ("Spice Diana", "sd-video-0001"),
            ("Spice Mirror", "sd-video-0002"),
            ("Spice Mirror", "sd-video-0001"),
        ]
    );
    assert!(items.iter().all(|i| i["source"] == "youtube"));
}

#[test]
fn cli_views() {
    use mockito::Matcher;

    let _m = mockito::mock("GET", "/watch")
        .match_query(Matcher::UrlEncoded("v".into(), "cli-video-1".into()))
        .with_body_from_file("testdata/watch_page.html")
        .create();

    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("config.toml"),
        format!("watch_base = \"{}/watch\"\n", mockito::server_url()),
    )
    .unwrap();
    std::fs::write(
        tmp.path().join("youtube_videos.json"),
        r#"{"items": [
            {"source": "youtube", "external_id": "cli-video-1", "title": "Kyoyina", "channel": "Spice Diana"},
            {"source": "youtube", "external_id": "UC-not-a-video", "artist_name": "Azawi", "subscribers": 1}
        ]}"#,
    )
    .unwrap();

    let out = chanpull(tmp.path(), &["views"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(tmp.path().join("youtube_views.json")).unwrap()).unwrap();
    let items = written["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["external_id"], "yt:cli-video-1");
    assert_eq!(items[0]["view_count"], 181230);
    assert!(items[0]["captured_at"].is_string());
}
