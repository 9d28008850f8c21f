//! Staged Loading Labels
//!
//! The prompt backend returns a short list of status strings. They are revealed
//! one at a time on a fixed spacing (label `i` at `i * spacing`), each carrying
//! the coarse percent it represents.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::timers::{TimerId, TimerRegistry};

/// Default spacing between revealed labels
pub const DEFAULT_LABEL_SPACING: Duration = Duration::from_millis(500);

/// One revealed label
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedLabel {
    /// Label text
    pub label: String,
    /// Zero-based position
    pub index: usize,
    /// Number of labels in the schedule
    pub total: usize,
    /// Percent this label represents
    pub percent: u8,
}

/// Percent represented by label `index` out of `total`
#[must_use]
pub fn label_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = ((index + 1) * 100 / total).min(100);
    u8::try_from(percent).unwrap_or(100)
}

/// Reveal `labels` on `spacing`, sending each through `wrap`
///
/// Returns `None` for an empty list. The first label is sent immediately.
pub fn schedule<M, F>(
    registry: &TimerRegistry,
    labels: Vec<String>,
    spacing: Duration,
    tx: mpsc::UnboundedSender<M>,
    wrap: F,
) -> Option<TimerId>
where
    M: Send + 'static,
    F: Fn(StagedLabel) -> M + Send + 'static,
{
    if labels.is_empty() {
        return None;
    }

    let total = labels.len();
    let id = registry.spawn(async move {
        let mut ticker = tokio::time::interval(spacing.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for (index, label) in labels.into_iter().enumerate() {
            ticker.tick().await;
            let staged = StagedLabel {
                label,
                index,
                total,
                percent: label_percent(index, total),
            };
            tracing::debug!(index, total, label = %staged.label, "Revealing staged label");
            if tx.send(wrap(staged)).is_err() {
                break;
            }
        }
    });
    Some(id)
}
