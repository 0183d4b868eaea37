//! The scroll-and-extract loop.
//!
//! Each iteration pauses for a randomized interval, re-scans the rendered
//! cards, records every card whose identifier is new, then scrolls to the
//! bottom and re-measures the page. The loop stops when the scroll budget
//! runs out, the record maximum is hit (possibly mid-page), the page height
//! stops growing, or no cards render at all.

pub mod card;
pub mod selectors;
pub mod surface;

use crate::config::HarvestLimits;
use crate::progress::{self, HarvestEventKind, ProgressSender};
use card::{extract_card, CardOutcome};
use feedharvest::{PostRecord, SeenSet, StopReason};
use surface::FeedSurface;

/// What a finished harvest produced.
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    /// Records in capture order.
    pub records: Vec<PostRecord>,
    pub stop: StopReason,
    /// Scroll iterations started.
    pub iterations: u32,
    /// Cards dropped without a record.
    pub skipped: usize,
}

/// Scraper state for one run: the page, the seen identifiers, and the
/// accumulated records.
pub struct HarvestSession<S: FeedSurface> {
    surface: S,
    limits: HarvestLimits,
    seen: SeenSet,
    records: Vec<PostRecord>,
    iterations: u32,
    skipped: usize,
    progress: Option<ProgressSender>,
    seq: u64,
}

impl<S: FeedSurface> HarvestSession<S> {
    pub fn new(surface: S, limits: HarvestLimits) -> Self {
        Self {
            surface,
            limits,
            seen: SeenSet::new(),
            records: Vec::new(),
            iterations: 0,
            skipped: 0,
            progress: None,
            seq: 0,
        }
    }

    /// Attach a progress channel.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Run the loop to completion.
    pub async fn run(mut self) -> HarvestOutcome {
        let stop = self.run_loop().await;

        tracing::info!(
            "harvest stopped after {} iteration(s): {stop} ({} records)",
            self.iterations,
            self.records.len()
        );
        progress::emit(
            &self.progress,
            &mut self.seq,
            HarvestEventKind::Stopped {
                reason: stop,
                total: self.records.len(),
                iterations: self.iterations,
            },
        );

        HarvestOutcome {
            records: self.records,
            stop,
            iterations: self.iterations,
            skipped: self.skipped,
        }
    }

    fn at_capacity(&self) -> bool {
        self.records.len() >= self.limits.max_records
    }

    async fn run_loop(&mut self) -> StopReason {
        if self.at_capacity() {
            return StopReason::MaxRecordsReached;
        }

        let mut last_height = match self.surface.scroll_height().await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("could not measure page height: {e:#}");
                return StopReason::BrowserError;
            }
        };

        for i in 0..self.limits.max_scrolls {
            self.iterations = i + 1;
            tracing::debug!("scrolling {}/{}", i + 1, self.limits.max_scrolls);
            progress::emit(
                &self.progress,
                &mut self.seq,
                HarvestEventKind::IterationStarted {
                    iteration: i + 1,
                    max_iterations: self.limits.max_scrolls,
                },
            );

            self.limits.scroll_pause.pause().await;

            let count = match self.surface.scan_cards().await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!("card scan failed: {e:#}");
                    return StopReason::BrowserError;
                }
            };
            tracing::debug!("found {count} card(s) on screen");
            progress::emit(
                &self.progress,
                &mut self.seq,
                HarvestEventKind::CardsFound { count },
            );

            if count == 0 {
                tracing::info!("no post cards on the page");
                return StopReason::NoCards;
            }

            if self.scan_page(count).await {
                return StopReason::MaxRecordsReached;
            }

            if let Err(e) = self.surface.scroll_to_bottom().await {
                tracing::warn!("scroll failed: {e:#}");
                return StopReason::BrowserError;
            }
            self.limits.scroll_pause.pause().await;

            let new_height = match self.surface.scroll_height().await {
                Ok(h) => h,
                Err(e) => {
                    tracing::warn!("could not measure page height: {e:#}");
                    return StopReason::BrowserError;
                }
            };
            if new_height == last_height {
                tracing::info!("no new content after scrolling (end of feed or rate limit)");
                return StopReason::FeedExhausted;
            }
            last_height = new_height;
        }

        StopReason::ScrollBudgetExhausted
    }

    /// Process the cards of one scan. Returns `true` once the record
    /// maximum is reached.
    async fn scan_page(&mut self, count: usize) -> bool {
        for index in 0..count {
            if self.at_capacity() {
                return true;
            }

            match extract_card(&self.surface, index, &self.seen).await {
                CardOutcome::Recorded(record) => {
                    self.seen.insert(record.id.clone());
                    let m = &record.metrics;
                    tracing::debug!(
                        "captured post {} by {} - R:{} RT:{} L:{} V:{} ({} total)",
                        record.id,
                        record.handle.as_deref().unwrap_or(feedharvest::SENTINEL),
                        m.replies,
                        m.reposts,
                        m.likes,
                        m.views.as_output(),
                        self.records.len() + 1
                    );
                    progress::emit(
                        &self.progress,
                        &mut self.seq,
                        HarvestEventKind::RecordCaptured {
                            id: record.id.clone(),
                            handle: record.handle.clone(),
                            replies: m.replies,
                            reposts: m.reposts,
                            likes: m.likes,
                            views: m.views.as_output().to_string(),
                            total: self.records.len() + 1,
                        },
                    );
                    self.records.push(record);
                }
                CardOutcome::AlreadySeen(_) => {}
                CardOutcome::Skipped(reason) => {
                    self.skipped += 1;
                    tracing::debug!("skipping card {index}: {reason}");
                    progress::emit(
                        &self.progress,
                        &mut self.seq,
                        HarvestEventKind::CardSkipped {
                            index,
                            reason: reason.to_string(),
                        },
                    );
                }
            }
        }
        self.at_capacity()
    }
}
