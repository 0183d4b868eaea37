//! Harvest loop tests against a scripted feed.

use anyhow::{bail, Result};
use async_trait::async_trait;
use feedharvest::{FieldLookup, MetricsOrigin, StopReason, ViewSource};
use feedharvest_runtime::config::{HarvestLimits, PauseRange};
use feedharvest_runtime::harvest::surface::{CardField, FeedSurface};
use feedharvest_runtime::harvest::HarvestSession;
use feedharvest_runtime::progress::{self, HarvestEventKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct MockCard {
    fields: HashMap<CardField, FieldLookup>,
}

impl MockCard {
    fn post(id: &str) -> Self {
        let mut fields = HashMap::new();
        let found = |s: String| FieldLookup::Found(s);
        fields.insert(
            CardField::Permalink,
            found(format!("https://x.com/user{id}/status/{id}")),
        );
        fields.insert(CardField::AuthorName, found(format!("Author {id}")));
        fields.insert(CardField::Handle, found(format!("@user{id}")));
        fields.insert(CardField::Body, found(format!("post body {id}")));
        fields.insert(
            CardField::Timestamp,
            found("2024-08-01T12:00:00.000Z".to_string()),
        );
        fields.insert(
            CardField::MetricsLabel,
            found("3 replies, 5 reposts, 10 likes, 1200 views".to_string()),
        );
        Self { fields }
    }

    fn with(mut self, field: CardField, lookup: FieldLookup) -> Self {
        self.fields.insert(field, lookup);
        self
    }

    fn without(mut self, field: CardField) -> Self {
        self.fields.remove(&field);
        self
    }
}

#[derive(Default)]
struct Counters {
    scans: AtomicUsize,
    scrolls: AtomicUsize,
    /// Every lookup as (scan number, card index, field).
    lookups: Mutex<Vec<(usize, usize, CardField)>>,
}

impl Counters {
    fn fields_read(&self, scan: usize, card: usize) -> Vec<CardField> {
        self.lookups
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, c, _)| *s == scan && *c == card)
            .map(|(_, _, f)| *f)
            .collect()
    }
}

/// Each scan shows the next page (the last one repeats); each scroll moves
/// to the next height (the last one repeats).
struct MockFeed {
    pages: Vec<Vec<MockCard>>,
    heights: Vec<u64>,
    current: Vec<MockCard>,
    fail_scan_at: Option<usize>,
    counters: Arc<Counters>,
}

impl MockFeed {
    fn new(pages: Vec<Vec<MockCard>>, heights: Vec<u64>) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let feed = Self {
            pages,
            heights,
            current: Vec::new(),
            fail_scan_at: None,
            counters: counters.clone(),
        };
        (feed, counters)
    }
}

#[async_trait]
impl FeedSurface for MockFeed {
    async fn scan_cards(&mut self) -> Result<usize> {
        let n = self.counters.scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_scan_at == Some(n) {
            bail!("page crashed");
        }
        let idx = n.min(self.pages.len().saturating_sub(1));
        self.current = self.pages.get(idx).cloned().unwrap_or_default();
        Ok(self.current.len())
    }

    async fn lookup(&self, card: usize, field: CardField) -> Result<FieldLookup> {
        let scan = self.counters.scans.load(Ordering::SeqCst).saturating_sub(1);
        self.counters
            .lookups
            .lock()
            .unwrap()
            .push((scan, card, field));
        Ok(self
            .current
            .get(card)
            .and_then(|c| c.fields.get(&field).cloned())
            .unwrap_or(FieldLookup::Missing))
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.counters.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn scroll_height(&self) -> Result<u64> {
        let n = self.counters.scrolls.load(Ordering::SeqCst);
        Ok(self.heights[n.min(self.heights.len() - 1)])
    }
}

fn limits(max_scrolls: u32, max_records: usize) -> HarvestLimits {
    HarvestLimits {
        max_scrolls,
        max_records,
        scroll_pause: PauseRange::none(),
    }
}

fn ids(records: &[feedharvest::PostRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn test_stale_link_skipped_siblings_recorded() {
    let (feed, counters) = MockFeed::new(
        vec![vec![
            MockCard::post("1"),
            MockCard::post("2").with(CardField::Permalink, FieldLookup::Stale),
            MockCard::post("3"),
        ]],
        vec![100, 100],
    );

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    assert_eq!(ids(&outcome.records), vec!["1", "3"]);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.stop, StopReason::FeedExhausted);
    assert_eq!(counters.scrolls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unchanged_height_stops_without_further_scrolls() {
    let (feed, counters) = MockFeed::new(vec![vec![MockCard::post("1")]], vec![500, 900, 900]);

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    assert_eq!(outcome.stop, StopReason::FeedExhausted);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(counters.scrolls.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.records.len(), 1);
}

#[tokio::test]
async fn test_max_records_stops_mid_page() {
    let (feed, counters) = MockFeed::new(
        vec![vec![
            MockCard::post("1"),
            MockCard::post("2"),
            MockCard::post("3"),
        ]],
        vec![100, 200],
    );

    let outcome = HarvestSession::new(feed, limits(10, 2)).run().await;

    assert_eq!(ids(&outcome.records), vec!["1", "2"]);
    assert_eq!(outcome.stop, StopReason::MaxRecordsReached);
    assert_eq!(counters.scrolls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_max_records_never_scans() {
    let (feed, counters) = MockFeed::new(vec![vec![MockCard::post("1")]], vec![100]);

    let outcome = HarvestSession::new(feed, limits(10, 0)).run().await;

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.stop, StopReason::MaxRecordsReached);
    assert_eq!(counters.scans.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_cards_stops_immediately() {
    let (feed, counters) = MockFeed::new(vec![vec![]], vec![100, 200]);

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.stop, StopReason::NoCards);
    assert_eq!(counters.scrolls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scroll_budget_exhausted() {
    let (feed, counters) = MockFeed::new(
        vec![vec![MockCard::post("1"), MockCard::post("2")]],
        vec![100, 200, 300, 400],
    );

    let outcome = HarvestSession::new(feed, limits(2, 100)).run().await;

    assert_eq!(outcome.stop, StopReason::ScrollBudgetExhausted);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(counters.scans.load(Ordering::SeqCst), 2);
    // Cards re-rendered on the second scan are not captured twice.
    assert_eq!(ids(&outcome.records), vec!["1", "2"]);
}

#[tokio::test]
async fn test_dedup_across_iterations() {
    let (feed, _) = MockFeed::new(
        vec![
            vec![MockCard::post("1"), MockCard::post("2")],
            vec![MockCard::post("2"), MockCard::post("3")],
        ],
        vec![100, 200, 200],
    );

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    assert_eq!(ids(&outcome.records), vec!["1", "2", "3"]);
    assert_eq!(outcome.stop, StopReason::FeedExhausted);
}

#[tokio::test]
async fn test_seen_cards_only_read_permalink() {
    let (feed, counters) = MockFeed::new(
        vec![
            vec![MockCard::post("1"), MockCard::post("2")],
            vec![MockCard::post("1"), MockCard::post("2"), MockCard::post("3")],
        ],
        vec![100, 200, 200],
    );

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    assert_eq!(ids(&outcome.records), vec!["1", "2", "3"]);
    assert_eq!(counters.fields_read(1, 0), vec![CardField::Permalink]);
    assert_eq!(counters.fields_read(1, 1), vec![CardField::Permalink]);
    assert!(counters
        .fields_read(1, 2)
        .contains(&CardField::MetricsLabel));
}

#[tokio::test]
async fn test_duplicate_within_one_scan_recorded_once() {
    let (feed, counters) = MockFeed::new(
        vec![vec![
            MockCard::post("1"),
            MockCard::post("1"),
            MockCard::post("2"),
        ]],
        vec![100, 100],
    );

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    assert_eq!(ids(&outcome.records), vec!["1", "2"]);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(counters.fields_read(0, 1), vec![CardField::Permalink]);
}

#[tokio::test]
async fn test_stale_metrics_label_skips_controls() {
    let card = MockCard::post("9")
        .with(CardField::MetricsLabel, FieldLookup::Stale)
        .with(CardField::ReplyCount, FieldLookup::Found("5".to_string()))
        .with(
            CardField::ViewsControl,
            FieldLookup::Found("7,400 views".to_string()),
        );
    let (feed, counters) = MockFeed::new(vec![vec![card]], vec![100, 100]);

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    let m = &outcome.records[0].metrics;
    assert_eq!((m.replies, m.reposts, m.likes), (0, 0, 0));
    assert_eq!(m.views.as_output(), "N/A");
    assert_eq!(m.origin, MetricsOrigin::Unavailable);
    let read = counters.fields_read(0, 0);
    assert!(!read.contains(&CardField::ReplyCount));
    assert!(!read.contains(&CardField::ViewsControl));
}

#[tokio::test]
async fn test_stale_field_becomes_sentinel() {
    let (feed, _) = MockFeed::new(
        vec![vec![MockCard::post("1").with(CardField::Body, FieldLookup::Stale)]],
        vec![100, 100],
    );

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    let record = &outcome.records[0];
    assert_eq!(record.text, None);
    assert_eq!(record.handle.as_deref(), Some("@user1"));
    assert_eq!(record.metrics.likes, 10);
}

#[tokio::test]
async fn test_full_label_parsed() {
    let (feed, _) = MockFeed::new(vec![vec![MockCard::post("42")]], vec![100, 100]);

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    let record = &outcome.records[0];
    assert_eq!(record.id, "42");
    assert_eq!(record.url, "https://x.com/user42/status/42");
    assert_eq!(record.timestamp.as_deref(), Some("2024-08-01T12:00:00.000Z"));
    let m = &record.metrics;
    assert_eq!((m.replies, m.reposts, m.likes), (3, 5, 10));
    assert_eq!(m.views.as_output(), "1200");
    assert_eq!(m.origin, MetricsOrigin::Aggregate);
}

#[tokio::test]
async fn test_individual_controls_fallback() {
    let card = MockCard::post("7")
        .without(CardField::MetricsLabel)
        .with(CardField::ReplyCount, FieldLookup::Found("5".to_string()))
        .with(CardField::LikeCount, FieldLookup::Found("1,234".to_string()))
        .with(
            CardField::ViewsControl,
            FieldLookup::Found("7,400 views".to_string()),
        );
    let (feed, _) = MockFeed::new(vec![vec![card]], vec![100, 100]);

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    let m = &outcome.records[0].metrics;
    assert_eq!((m.replies, m.reposts, m.likes), (5, 0, 1234));
    assert_eq!(m.views.as_output(), "7400");
    assert_eq!(m.views.source, ViewSource::Control);
    assert_eq!(m.origin, MetricsOrigin::Controls);
}

#[tokio::test]
async fn test_no_metrics_anywhere() {
    let card = MockCard::post("8").without(CardField::MetricsLabel);
    let (feed, _) = MockFeed::new(vec![vec![card]], vec![100, 100]);

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    let m = &outcome.records[0].metrics;
    assert_eq!((m.replies, m.reposts, m.likes), (0, 0, 0));
    assert_eq!(m.views.as_output(), "N/A");
    assert_eq!(m.origin, MetricsOrigin::Unavailable);
}

#[tokio::test]
async fn test_scan_failure_keeps_collected_records() {
    let (mut feed, _) = MockFeed::new(
        vec![vec![MockCard::post("1"), MockCard::post("2")]],
        vec![100, 200, 300],
    );
    feed.fail_scan_at = Some(1);

    let outcome = HarvestSession::new(feed, limits(10, 100)).run().await;

    assert_eq!(outcome.stop, StopReason::BrowserError);
    assert_eq!(ids(&outcome.records), vec!["1", "2"]);
}

#[tokio::test]
async fn test_progress_events_reported() {
    let (feed, _) = MockFeed::new(vec![vec![MockCard::post("1")]], vec![100, 100]);
    let (tx, mut rx) = progress::channel();

    let outcome = HarvestSession::new(feed, limits(10, 100))
        .with_progress(tx)
        .run()
        .await;
    assert_eq!(outcome.records.len(), 1);

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.event);
    }
    assert!(matches!(kinds.first(), Some(HarvestEventKind::IterationStarted { iteration: 1, .. })));
    assert!(kinds
        .iter()
        .any(|k| matches!(k, HarvestEventKind::RecordCaptured { total: 1, .. })));
    assert!(matches!(
        kinds.last(),
        Some(HarvestEventKind::Stopped {
            reason: StopReason::FeedExhausted,
            total: 1,
            ..
        })
    ));
}
