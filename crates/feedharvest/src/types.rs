//! Core data types for harvested posts.

use serde::{Deserialize, Serialize};

/// Placeholder written for any field that could not be read.
pub const SENTINEL: &str = "N/A";

/// One harvested post.
///
/// Built once while scanning a rendered card and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Unique key parsed from the permalink.
    pub id: String,
    pub author_name: Option<String>,
    /// Handle including the leading `@`.
    pub handle: Option<String>,
    pub text: Option<String>,
    /// Machine-readable `datetime` attribute, not the rendered relative time.
    pub timestamp: Option<String>,
    pub metrics: Metrics,
    pub url: String,
}

impl PostRecord {
    /// Start a record with every optional field at its sentinel/default.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author_name: None,
            handle: None,
            text: None,
            timestamp: None,
            metrics: Metrics::default(),
            url: url.into(),
        }
    }
}

/// Engagement counts for a single post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub replies: u64,
    pub reposts: u64,
    pub likes: u64,
    pub views: ViewCount,
    pub origin: MetricsOrigin,
}

/// Where the engagement counts were read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsOrigin {
    /// Aggregate accessible label with at least one labeled count.
    Aggregate,
    /// The aggregate label was present but matched none of replies, reposts or likes.
    AggregateUnparsed,
    /// Individual per-metric controls.
    Controls,
    /// Nothing readable; every count is at its default.
    #[default]
    Unavailable,
}

impl std::fmt::Display for MetricsOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aggregate => write!(f, "aggregate"),
            Self::AggregateUnparsed => write!(f, "aggregate_unparsed"),
            Self::Controls => write!(f, "controls"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// View count kept as text, since the source is a human-formatted label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    pub text: Option<String>,
    pub source: ViewSource,
}

impl ViewCount {
    pub fn new(text: impl Into<String>, source: ViewSource) -> Self {
        Self {
            text: Some(text.into()),
            source,
        }
    }

    /// The view count as written to output (`N/A` when unknown).
    pub fn as_output(&self) -> &str {
        self.text.as_deref().unwrap_or(SENTINEL)
    }
}

/// Provenance of a parsed view count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSource {
    /// Explicit `"<n> views"` match in the aggregate label.
    Labeled,
    /// Read from a dedicated views control.
    Control,
    /// Last number in the aggregate label. Unreliable: a trailing bookmark
    /// count is indistinguishable from a view count.
    TrailingNumber,
    #[default]
    Unavailable,
}

impl ViewSource {
    /// Rough confidence that the value really is the view count.
    pub fn confidence(&self) -> f32 {
        match self {
            Self::Labeled => 0.95,
            Self::Control => 0.85,
            Self::TrailingNumber => 0.40,
            Self::Unavailable => 0.0,
        }
    }

    pub fn is_heuristic(&self) -> bool {
        matches!(self, Self::TrailingNumber)
    }
}

impl std::fmt::Display for ViewSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Labeled => write!(f, "labeled"),
            Self::Control => write!(f, "control"),
            Self::TrailingNumber => write!(f, "trailing_number"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Result of reading one field from a rendered card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLookup {
    Found(String),
    /// The element for this field does not exist in the card.
    Missing,
    /// The card (or the element) left the page while it was being read.
    Stale,
}

impl FieldLookup {
    /// Collapse to an optional value, treating blank text as absent.
    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Found(v) => {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Self::Missing | Self::Stale => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

/// Why the harvest loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every configured scroll iteration ran.
    ScrollBudgetExhausted,
    /// The configured record maximum was reached.
    MaxRecordsReached,
    /// Page height did not change after a scroll (feed exhausted or rate-limited).
    FeedExhausted,
    /// An iteration found no post cards at all.
    NoCards,
    /// The browser stopped answering page-level queries.
    BrowserError,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScrollBudgetExhausted => write!(f, "scroll budget exhausted"),
            Self::MaxRecordsReached => write!(f, "maximum record count reached"),
            Self::FeedExhausted => write!(f, "no new content after scrolling"),
            Self::NoCards => write!(f, "no post cards found"),
            Self::BrowserError => write!(f, "browser error"),
        }
    }
}

/// Errors from the feedharvest library.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
