use serde_json::Value;

use yt_harvest::collector::StopReason;
use yt_harvest::config::{HarvestConfig, ScanMode};
use yt_harvest::error::{HarvestError, Result};
use yt_harvest::harvest;
use yt_harvest::models::{LinkDescriptor, Poll, RawItem, SourceType, VideoRecord};
use yt_harvest::outputs::{CSV_MEDIA_TYPE, MemorySink, Payload};
use yt_harvest::pipeline::EmptyResult;
use yt_harvest::scrapers::{ContentSource, ScriptedSource, SnapshotSource};

fn poll(urls: &[&str], growth: u64) -> Poll {
    Poll {
        items: urls.iter().map(|u| RawItem::link(*u)).collect(),
        growth_metric: growth,
    }
}

fn quiet_config(scan: ScanMode) -> HarvestConfig {
    let mut config = HarvestConfig::preset(scan);
    config.collect.delay_ms = 0;
    config
}

fn csv_data_rows(payload: &Payload) -> usize {
    payload
        .content
        .trim_start_matches('\u{FEFF}')
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .count()
        - 1
}

fn json_array(payload: &Payload) -> Vec<Value> {
    match serde_json::from_str(&payload.content).unwrap() {
        Value::Array(items) => items,
        other => panic!("expected array, got {}", other),
    }
}

#[tokio::test]
async fn test_scroll_until_no_new_records() {
    let mut config = quiet_config(ScanMode::Links);
    config.collect.stop_on_no_growth = false;

    let both = [
        "https://www.youtube.com/watch?v=abc123XYZ",
        "https://www.youtube.com/shorts/def456UVW?t=5",
    ];
    let mut source = ScriptedSource::new(vec![
        poll(&["https://www.youtube.com/watch?v=abc123XYZ"], 1000),
        poll(&both, 1000),
        poll(&both, 1000),
    ]);
    let mut sink = MemorySink::default();

    let (records, report) = harvest::<LinkDescriptor, _, _>(&config, &mut source, &mut sink, None)
        .await
        .unwrap();

    assert_eq!(source.triggers(), 3);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.stop_reason, StopReason::NoNewRecords);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].id, "abc123XYZ");
    assert_eq!(records[0].source_type, SourceType::Primary);
    assert!(!records[0].is_short_form);
    assert_eq!(records[1].id, "def456UVW");
    assert_eq!(records[1].source_type, SourceType::ShortForm);
    assert!(records[1].is_short_form);
    assert_eq!(records[1].canonical_url, "https://www.youtube.com/watch?v=def456UVW");

    assert_eq!(sink.delivered.len(), 2);
    let csv = &sink.delivered[0];
    assert_eq!(csv.filename, "youtube_links.csv");
    assert_eq!(csv.media_type, CSV_MEDIA_TYPE);
    assert_eq!(csv_data_rows(csv), records.len());

    let json = json_array(&sink.delivered[1]);
    assert_eq!(json.len(), 2);
    assert_eq!(json[1]["sourceType"], "shortForm");
    assert_eq!(json[1]["isShortForm"], true);
    assert_eq!(json[1]["originalUrl"], "https://www.youtube.com/shorts/def456UVW?t=5");
}

#[tokio::test]
async fn test_default_policy_stops_when_page_stops_growing() {
    let config = quiet_config(ScanMode::Links);
    let mut source = ScriptedSource::new(vec![
        poll(&["https://youtu.be/abc123XYZ"], 500),
        poll(&["https://youtu.be/abc123XYZ", "https://youtu.be/def456UVW"], 500),
    ]);
    let mut sink = MemorySink::default();

    let (records, report) = harvest::<LinkDescriptor, _, _>(&config, &mut source, &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.iterations, 2);
    assert_eq!(report.stop_reason, StopReason::NoGrowth);
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_endless_page_is_capped() {
    struct Endless(u64);

    impl ContentSource for Endless {
        async fn trigger_growth(&mut self) -> Result<()> {
            self.0 += 1;
            Ok(())
        }

        async fn poll(&mut self) -> Result<Poll> {
            let urls: Vec<String> = (0..self.0)
                .map(|i| format!("https://www.youtube.com/watch?v=video{:06}", i))
                .collect();
            Ok(Poll {
                items: urls.into_iter().map(RawItem::link).collect(),
                growth_metric: self.0 * 100,
            })
        }
    }

    let mut config = quiet_config(ScanMode::Links);
    config.collect.max_iterations = 7;
    config.collect.target_count = None;
    let mut sink = MemorySink::default();

    let (records, report) = harvest::<LinkDescriptor, _, _>(&config, &mut Endless(0), &mut sink, None)
        .await
        .unwrap();

    assert_eq!(report.iterations, 7);
    assert_eq!(report.stop_reason, StopReason::IterationCap);
    assert_eq!(records.len(), 7);
}

#[tokio::test]
async fn test_source_failure_exports_partial_results() {
    struct Failing {
        polls: usize,
    }

    impl ContentSource for Failing {
        async fn trigger_growth(&mut self) -> Result<()> {
            if self.polls >= 2 {
                return Err(HarvestError::Source("tab crashed".to_string()));
            }
            Ok(())
        }

        async fn poll(&mut self) -> Result<Poll> {
            self.polls += 1;
            let url = format!("https://www.youtube.com/watch?v=partial{:04}", self.polls);
            Ok(Poll {
                items: vec![RawItem::link(url)],
                growth_metric: self.polls as u64,
            })
        }
    }

    let config = quiet_config(ScanMode::Links);
    let mut sink = MemorySink::default();
    let (records, report) =
        harvest::<LinkDescriptor, _, _>(&config, &mut Failing { polls: 0 }, &mut sink, None)
            .await
            .unwrap();

    assert_eq!(records.len(), 2);
    assert!(matches!(report.stop_reason, StopReason::SourceFailed(_)));
    assert_eq!(sink.delivered.len(), 2);
}

#[tokio::test]
async fn test_empty_page_reports_no_links() {
    let config = quiet_config(ScanMode::Links);
    let mut source = ScriptedSource::new(vec![poll(&[], 10)]);
    let mut sink = MemorySink::default();

    let (records, report) = harvest::<LinkDescriptor, _, _>(&config, &mut source, &mut sink, None)
        .await
        .unwrap();

    assert!(records.is_empty());
    assert!(sink.delivered.is_empty());
    assert_eq!(report.empty_result(), Some(EmptyResult::NoLinks));
}

#[tokio::test]
async fn test_unrecognized_links_are_reported() {
    let config = quiet_config(ScanMode::Links);
    let mut source = ScriptedSource::new(vec![poll(
        &["https://example.com/watch?v=abc123XYZ", "mailto:someone@example.com"],
        10,
    )]);
    let mut sink = MemorySink::default();

    let (_, report) = harvest::<LinkDescriptor, _, _>(&config, &mut source, &mut sink, None)
        .await
        .unwrap();

    assert!(report.raw_seen > 0);
    assert_eq!(report.rejected, report.raw_seen);
    assert_eq!(report.empty_result(), Some(EmptyResult::NoneRecognized));
}

const GRID_FIRST: &str = r#"<html><head><title>Rustacean Station - YouTube</title></head><body>
    <ytd-rich-grid-media>
      <a id="video-title-link" href="/watch?v=abc123XYZ">Async Rust, "explained"</a>
      <div id="metadata-line"><span>1.2K views</span><span>2 days ago</span></div>
      <ytd-thumbnail-overlay-time-status-renderer><span>12:34</span></ytd-thumbnail-overlay-time-status-renderer>
    </ytd-rich-grid-media>
    </body></html>"#;

const GRID_SECOND: &str = r#"<html><head><title>Rustacean Station - YouTube</title></head><body>
    <ytd-rich-grid-media>
      <a id="video-title-link" href="/watch?v=abc123XYZ">Async Rust, "explained"</a>
      <div id="metadata-line"><span>1.2K views</span><span>2 days ago</span></div>
      <ytd-thumbnail-overlay-time-status-renderer><span>12:34</span></ytd-thumbnail-overlay-time-status-renderer>
    </ytd-rich-grid-media>
    <ytd-rich-grid-media>
      <a id="video-title" href="/shorts/def456UVW">Borrow checker in 30 seconds</a>
      <div id="metadata-line"><span>3 triệu lượt xem</span><span>1 tuần trước</span></div>
    </ytd-rich-grid-media>
    </body></html>"#;

#[tokio::test]
async fn test_grid_scan_splits_exports_by_channel() {
    let config = quiet_config(ScanMode::Grid);
    let mut source =
        SnapshotSource::new(vec![GRID_FIRST.to_string(), GRID_SECOND.to_string()], &config).unwrap();
    let channel = source.channel_name();
    assert_eq!(channel, "Rustacean Station");

    let mut sink = MemorySink::default();
    let (records, report) =
        harvest::<VideoRecord, _, _>(&config, &mut source, &mut sink, Some(&channel))
            .await
            .unwrap();

    assert_eq!(report.stop_reason, StopReason::NoGrowth);
    assert_eq!(report.iterations, 3);
    assert_eq!(records.len(), 2);

    let video = &records[0];
    assert_eq!(video.duration_seconds, Some(754));
    assert_eq!(video.view_count, Some(1200));
    assert!(video.published_at.is_some());
    assert_eq!(
        video.thumbnail_urls.get("hqdefault").and_then(Value::as_str),
        Some("https://i.ytimg.com/vi/abc123XYZ/hqdefault.jpg")
    );
    let short = &records[1];
    assert_eq!(short.view_count, Some(3_000_000));
    assert!(short.link.is_short_form);

    let names: Vec<&str> = sink.delivered.iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Rustacean_Station_video.csv",
            "Rustacean_Station_video.json",
            "Rustacean_Station_short.csv",
            "Rustacean_Station_short.json",
        ]
    );

    let video_csv = &sink.delivered[0];
    assert_eq!(csv_data_rows(video_csv), 1);
    assert!(video_csv.content.contains(r#""Async Rust, ""explained""""#));

    let video_json = json_array(&sink.delivered[1]);
    assert_eq!(video_json[0]["id"], "abc123XYZ");
    assert_eq!(video_json[0]["durationSeconds"], 754);
    assert_eq!(video_json[0]["viewCount"], 1200);

    let short_json = json_array(&sink.delivered[3]);
    assert_eq!(short_json[0]["durationText"], Value::Null);
}

#[tokio::test]
async fn test_grid_filters_drop_short_form() {
    let mut config = quiet_config(ScanMode::Grid);
    config.filters.include_short_form = false;
    let mut source =
        SnapshotSource::new(vec![GRID_FIRST.to_string(), GRID_SECOND.to_string()], &config).unwrap();

    let mut sink = MemorySink::default();
    let (records, report) = harvest::<VideoRecord, _, _>(&config, &mut source, &mut sink, Some("Rust"))
        .await
        .unwrap();

    assert_eq!(report.unique, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].link.id, "abc123XYZ");
    assert_eq!(sink.delivered.len(), 2);
    assert_eq!(sink.delivered[0].filename, "Rust_video.csv");
}
