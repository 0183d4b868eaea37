//! Per-card extraction.
//!
//! Every field is read independently. A missing or stale field becomes its
//! sentinel/default while the rest of the record is still built; only an
//! unreadable permalink drops the card, since there is no identifier
//! without it.

use super::surface::{CardField, FeedSurface};
use feedharvest::{
    parse_aggregate_label, parse_count, parse_post_id, parse_views_label, FieldLookup, Metrics,
    MetricsOrigin, PostRecord, SeenSet, ViewCount, ViewSource,
};

/// Result of examining one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    Recorded(PostRecord),
    /// The identifier was recorded earlier in this session.
    AlreadySeen(String),
    Skipped(SkipReason),
}

/// Why a card produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The card went stale while its permalink was being read.
    StaleLink,
    /// The card has no permalink.
    MissingLink,
    /// The permalink held no identifier.
    UnparseableLink(String),
    /// The browser failed while reading the permalink.
    Error(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaleLink => write!(f, "card went stale"),
            Self::MissingLink => write!(f, "no permalink"),
            Self::UnparseableLink(href) => write!(f, "no identifier in {href}"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

/// Extract a record from card `index`, skipping identifiers in `seen`.
pub async fn extract_card<S>(surface: &S, index: usize, seen: &SeenSet) -> CardOutcome
where
    S: FeedSurface + ?Sized,
{
    let href = match surface.lookup(index, CardField::Permalink).await {
        Ok(FieldLookup::Found(href)) => href,
        Ok(FieldLookup::Stale) => return CardOutcome::Skipped(SkipReason::StaleLink),
        Ok(FieldLookup::Missing) => return CardOutcome::Skipped(SkipReason::MissingLink),
        Err(e) => return CardOutcome::Skipped(SkipReason::Error(format!("{e:#}"))),
    };

    let Some(id) = parse_post_id(&href) else {
        return CardOutcome::Skipped(SkipReason::UnparseableLink(href));
    };

    if seen.contains(&id) {
        return CardOutcome::AlreadySeen(id);
    }

    let mut record = PostRecord::new(id.clone(), href.trim());
    record.author_name = read_field(surface, index, CardField::AuthorName, &id).await;
    record.handle = read_field(surface, index, CardField::Handle, &id).await;
    record.text = read_field(surface, index, CardField::Body, &id).await;
    record.timestamp = read_field(surface, index, CardField::Timestamp, &id).await;
    record.metrics = extract_metrics(surface, index, &id).await;

    CardOutcome::Recorded(record)
}

/// Best-effort read of a single text field.
async fn read_field<S>(surface: &S, index: usize, field: CardField, id: &str) -> Option<String>
where
    S: FeedSurface + ?Sized,
{
    match surface.lookup(index, field).await {
        Ok(lookup) => {
            if lookup.is_stale() {
                tracing::debug!("{field} went stale for post {id}");
            }
            lookup.into_value()
        }
        Err(e) => {
            tracing::debug!("reading {field} for post {id} failed: {e:#}");
            None
        }
    }
}

/// Engagement counts, preferring the aggregate label over individual controls.
pub async fn extract_metrics<S>(surface: &S, index: usize, id: &str) -> Metrics
where
    S: FeedSurface + ?Sized,
{
    match surface.lookup(index, CardField::MetricsLabel).await {
        Ok(FieldLookup::Found(label)) => {
            let metrics = parse_aggregate_label(&label);
            if metrics.origin == MetricsOrigin::AggregateUnparsed {
                tracing::debug!("metrics label for post {id} had no recognizable counts: {label:?}");
            }
            if metrics.views.source.is_heuristic() {
                tracing::debug!(
                    "views for post {id} taken from the last number in the label (unreliable)"
                );
            }
            metrics
        }
        Ok(FieldLookup::Missing) => {
            tracing::debug!("no metrics label for post {id}, reading individual controls");
            metrics_from_controls(surface, index, id).await
        }
        Ok(FieldLookup::Stale) => {
            tracing::debug!("metrics went stale for post {id}");
            Metrics::default()
        }
        Err(e) => {
            tracing::debug!("reading metrics for post {id} failed: {e:#}");
            Metrics::default()
        }
    }
}

async fn metrics_from_controls<S>(surface: &S, index: usize, id: &str) -> Metrics
where
    S: FeedSurface + ?Sized,
{
    let mut any_found = false;
    let mut counts = [0u64; 3];
    let fields = [
        CardField::ReplyCount,
        CardField::RepostCount,
        CardField::LikeCount,
    ];

    for (slot, field) in counts.iter_mut().zip(fields) {
        if let Ok(FieldLookup::Found(text)) = surface.lookup(index, field).await {
            any_found = true;
            match parse_count(&text) {
                Some(n) => *slot = n,
                None => tracing::debug!("unparseable {field} {text:?} for post {id}"),
            }
        }
    }

    let views = match surface.lookup(index, CardField::ViewsControl).await {
        Ok(FieldLookup::Found(label)) => {
            any_found = true;
            parse_views_label(&label)
                .map(|v| ViewCount::new(v, ViewSource::Control))
                .unwrap_or_default()
        }
        _ => ViewCount::default(),
    };

    Metrics {
        replies: counts[0],
        reposts: counts[1],
        likes: counts[2],
        views,
        origin: if any_found {
            MetricsOrigin::Controls
        } else {
            MetricsOrigin::Unavailable
        },
    }
}
