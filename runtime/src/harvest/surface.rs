//! The page seam of the harvest loop.
//!
//! [`FeedSurface`] is everything the loop needs from a page: re-query the
//! rendered cards, read one field of one card, scroll, and measure height.
//! [`DomFeed`] implements it over a live [`RenderContext`]; tests implement
//! it with scripted pages.

use super::selectors;
use crate::renderer::RenderContext;
use crate::wait::js_string;
use anyhow::{Context, Result};
use async_trait::async_trait;
use feedharvest::FieldLookup;
use serde::Deserialize;

/// A field that can be read from a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardField {
    Permalink,
    AuthorName,
    Handle,
    Body,
    Timestamp,
    MetricsLabel,
    ReplyCount,
    RepostCount,
    LikeCount,
    ViewsControl,
}

/// How a field's value is read from its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Rendered text.
    Text,
    /// Resolved absolute link target.
    Href,
    /// Raw attribute value.
    Attr(&'static str),
}

impl CardField {
    pub fn xpath(&self) -> &'static str {
        match self {
            Self::Permalink => selectors::PERMALINK,
            Self::AuthorName => selectors::AUTHOR_NAME,
            Self::Handle => selectors::HANDLE,
            Self::Body => selectors::BODY,
            Self::Timestamp => selectors::TIME,
            Self::MetricsLabel => selectors::METRICS_LABEL,
            Self::ReplyCount => selectors::REPLY_COUNT,
            Self::RepostCount => selectors::REPOST_COUNT,
            Self::LikeCount => selectors::LIKE_COUNT,
            Self::ViewsControl => selectors::VIEWS_CONTROL,
        }
    }

    pub fn read_mode(&self) -> ReadMode {
        match self {
            Self::Permalink => ReadMode::Href,
            Self::Timestamp => ReadMode::Attr("datetime"),
            Self::MetricsLabel | Self::ViewsControl => ReadMode::Attr("aria-label"),
            _ => ReadMode::Text,
        }
    }
}

impl std::fmt::Display for CardField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Permalink => "permalink",
            Self::AuthorName => "author name",
            Self::Handle => "handle",
            Self::Body => "body text",
            Self::Timestamp => "timestamp",
            Self::MetricsLabel => "metrics label",
            Self::ReplyCount => "reply count",
            Self::RepostCount => "repost count",
            Self::LikeCount => "like count",
            Self::ViewsControl => "views control",
        };
        write!(f, "{name}")
    }
}

/// What the harvest loop needs from a page.
#[async_trait]
pub trait FeedSurface: Send + Sync {
    /// Re-query the rendered cards and return how many there are.
    /// Card indices passed to [`FeedSurface::lookup`] refer to the latest scan.
    async fn scan_cards(&mut self) -> Result<usize>;
    /// Read one field of one card.
    async fn lookup(&self, card: usize, field: CardField) -> Result<FieldLookup>;
    /// Scroll the viewport to the current document height.
    async fn scroll_to_bottom(&mut self) -> Result<()>;
    /// Current document scroll height.
    async fn scroll_height(&self) -> Result<u64>;
}

/// Global the card snapshot is stored under between scripts.
const CARD_SLOT: &str = "window.__feedharvestCards";

#[derive(Debug, Deserialize)]
struct LookupReply {
    state: String,
    #[serde(default)]
    value: Option<String>,
}

/// [`FeedSurface`] over a live browser page.
///
/// Cards are held as element references in a page global, so an element
/// that React replaced between the scan and a lookup reports as stale.
pub struct DomFeed<'a> {
    ctx: &'a dyn RenderContext,
}

impl<'a> DomFeed<'a> {
    pub fn new(ctx: &'a dyn RenderContext) -> Self {
        Self { ctx }
    }
}

fn scan_script() -> String {
    format!(
        r#"(() => {{
  const snap = document.evaluate({xp}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
  const cards = [];
  for (let i = 0; i < snap.snapshotLength; i++) cards.push(snap.snapshotItem(i));
  {slot} = cards;
  return cards.length;
}})()"#,
        xp = js_string(selectors::CARDS),
        slot = CARD_SLOT,
    )
}

fn lookup_script(card: usize, field: CardField) -> String {
    let read = match field.read_mode() {
        ReadMode::Text => "node.innerText".to_string(),
        ReadMode::Href => "(node.href || node.getAttribute('href'))".to_string(),
        ReadMode::Attr(name) => format!("node.getAttribute({})", js_string(name)),
    };
    format!(
        r#"(() => {{
  const cards = {slot} || [];
  const card = cards[{card}];
  if (!card || !card.isConnected) return {{ state: "stale" }};
  const node = document.evaluate({xp}, card, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  if (!node) return {{ state: "missing" }};
  if (!node.isConnected) return {{ state: "stale" }};
  const value = {read};
  if (value === null || value === undefined) return {{ state: "missing" }};
  return {{ state: "found", value: String(value) }};
}})()"#,
        slot = CARD_SLOT,
        xp = js_string(field.xpath()),
    )
}

#[async_trait]
impl FeedSurface for DomFeed<'_> {
    async fn scan_cards(&mut self) -> Result<usize> {
        let value = self
            .ctx
            .execute_js(&scan_script())
            .await
            .context("failed to query post cards")?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn lookup(&self, card: usize, field: CardField) -> Result<FieldLookup> {
        let value = self
            .ctx
            .execute_js(&lookup_script(card, field))
            .await
            .with_context(|| format!("failed to read {field} of card {card}"))?;
        let reply: LookupReply =
            serde_json::from_value(value).context("unexpected lookup reply")?;
        Ok(match (reply.state.as_str(), reply.value) {
            ("found", Some(v)) => FieldLookup::Found(v),
            ("stale", _) => FieldLookup::Stale,
            _ => FieldLookup::Missing,
        })
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.ctx
            .execute_js("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .context("failed to scroll")?;
        Ok(())
    }

    async fn scroll_height(&self) -> Result<u64> {
        let value = self
            .ctx
            .execute_js("document.body.scrollHeight")
            .await
            .context("failed to measure scroll height")?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f as u64))
            .context("scroll height was not a number")
    }
}
