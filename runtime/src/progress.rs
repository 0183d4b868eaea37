// Copyright 2026 Feedharvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for harvest telemetry.
//!
//! The harvest loop emits `HarvestEvent`s which flow through a
//! `tokio::sync::broadcast` channel to any subscriber (the CLI progress bar).
//! When no subscriber exists, events are silently dropped.

use feedharvest::StopReason;
use serde::{Deserialize, Serialize};

/// A progress event emitted during a harvest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestEvent {
    /// Monotonically increasing sequence number.
    pub seq: u64,
    pub event: HarvestEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HarvestEventKind {
    /// A scroll-and-scan iteration began.
    IterationStarted { iteration: u32, max_iterations: u32 },
    /// Cards currently rendered on the page.
    CardsFound { count: usize },
    /// A new post was recorded.
    RecordCaptured {
        id: String,
        handle: Option<String>,
        replies: u64,
        reposts: u64,
        likes: u64,
        views: String,
        total: usize,
    },
    /// A card was skipped without producing a record.
    CardSkipped { index: usize, reason: String },
    /// The loop finished.
    Stopped {
        reason: StopReason,
        total: usize,
        iterations: u32,
    },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<HarvestEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<HarvestEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Emit a progress event, ignoring send errors (no receivers listening).
pub fn emit(tx: &Option<ProgressSender>, seq: &mut u64, event: HarvestEventKind) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(HarvestEvent { seq: *seq, event });
    }
}
