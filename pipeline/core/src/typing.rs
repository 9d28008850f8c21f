//! Typing Animation
//!
//! Placeholder text shown while the prompt backend is working. Sentences are
//! revealed one character per tick, held for a pause, cleared, and then the
//! next sentence starts. The cycle repeats until the animation is stopped.
//!
//! The reveal logic lives in [`TypingState`], a pure state machine that
//! returns the frame to show and how long to wait before the next step.
//! [`TypingAnimation`] drives it from a single registered task, so there is
//! never more than one pending tick per animation.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::timers::{TimerId, TimerRegistry};

/// Default placeholder sentences
pub const DEFAULT_SENTENCES: [&str; 4] = [
    "Generating Prompt...",
    "This might take a while, but we promise it's worth the wait!",
    "Finding the best matches for your movie plot...",
    "Hang tight, we're creating something amazing for you!",
];

/// Typing animation settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypingConfig {
    /// Sentences to cycle through
    pub sentences: Vec<String>,
    /// Delay between revealed characters
    pub typing: Duration,
    /// Hold time once a sentence is fully shown
    pub pause_after_typing: Duration,
    /// Blank time between sentences
    pub delay_between_sentences: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            sentences: DEFAULT_SENTENCES.iter().map(ToString::to_string).collect(),
            typing: Duration::from_millis(100),
            pause_after_typing: Duration::from_millis(1000),
            delay_between_sentences: Duration::from_millis(1500),
        }
    }
}

/// Where the animation is within the current sentence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TypingStage {
    /// Revealing characters
    #[default]
    Typing,
    /// Sentence fully shown
    PausedAfterType,
    /// Text cleared, waiting for the next sentence
    Cleared,
}

/// One rendered animation frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypingFrame {
    /// Text revealed so far
    pub text: String,
    /// Index of the sentence being shown
    pub sentence: usize,
}

/// Pure reveal state machine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypingState {
    sentence: usize,
    revealed: usize,
    stage: TypingStage,
}

impl TypingState {
    /// Fresh state at the start of the first sentence
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage
    #[must_use]
    pub fn stage(&self) -> TypingStage {
        self.stage
    }

    /// Advance one step; returns the frame to show and the delay until the next step
    ///
    /// Returns `None` when there are no sentences to show.
    pub fn advance(&mut self, config: &TypingConfig) -> Option<(TypingFrame, Duration)> {
        let count = config.sentences.len();
        if count == 0 {
            return None;
        }
        self.sentence %= count;

        match self.stage {
            TypingStage::Typing => {
                let sentence = &config.sentences[self.sentence];
                let len = sentence.chars().count();
                self.revealed = (self.revealed + 1).min(len);

                let text: String = sentence.chars().take(self.revealed).collect();
                let delay = if self.revealed >= len {
                    self.stage = TypingStage::PausedAfterType;
                    config.pause_after_typing
                } else {
                    config.typing
                };
                Some((self.frame(text), delay))
            }
            TypingStage::PausedAfterType => {
                self.stage = TypingStage::Cleared;
                Some((self.frame(String::new()), config.delay_between_sentences))
            }
            TypingStage::Cleared => {
                self.sentence = (self.sentence + 1) % count;
                self.revealed = 0;
                self.stage = TypingStage::Typing;
                self.advance(config)
            }
        }
    }

    fn frame(&self, text: String) -> TypingFrame {
        TypingFrame {
            text,
            sentence: self.sentence,
        }
    }
}

/// A running (or stopped) typing animation
#[derive(Debug)]
pub struct TypingAnimation {
    registry: TimerRegistry,
    current: Option<TimerId>,
}

impl TypingAnimation {
    /// Create an idle animation whose ticks are registered in `registry`
    #[must_use]
    pub fn new(registry: TimerRegistry) -> Self {
        Self {
            registry,
            current: None,
        }
    }

    /// Start from the first sentence, replacing any running cycle
    ///
    /// Each frame is passed through `wrap` and sent on `tx`. The task ends on
    /// its own when the receiver is dropped.
    pub fn start<M, F>(&mut self, config: TypingConfig, tx: mpsc::UnboundedSender<M>, wrap: F)
    where
        M: Send + 'static,
        F: Fn(TypingFrame) -> M + Send + 'static,
    {
        self.stop();
        if config.sentences.is_empty() {
            return;
        }

        let id = self.registry.spawn(async move {
            let mut state = TypingState::new();
            let mut ticker = tokio::time::interval(config.typing.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some((frame, delay)) = state.advance(&config) else {
                    break;
                };
                if tx.send(wrap(frame)).is_err() {
                    break;
                }
                ticker.reset_after(delay);
            }
        });
        self.current = Some(id);
    }

    /// Stop the cycle; a no-op when not running
    pub fn stop(&mut self) {
        if let Some(id) = self.current.take() {
            self.registry.cancel(id);
        }
    }

    /// Whether a cycle has been started and not stopped
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for TypingAnimation {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(sentences: &[&str]) -> TypingConfig {
        TypingConfig {
            sentences: sentences.iter().map(ToString::to_string).collect(),
            typing: Duration::from_millis(100),
            pause_after_typing: Duration::from_millis(1000),
            delay_between_sentences: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_state_machine_cycles_sentences() {
        let config = config(&["ab", "c"]);
        let mut state = TypingState::new();
        let mut frames = Vec::new();

        for _ in 0..8 {
            let (frame, delay) = state.advance(&config).unwrap();
            frames.push((frame.text, frame.sentence, delay.as_millis()));
        }

        assert_eq!(
            frames,
            vec![
                ("a".to_string(), 0, 100),
                ("ab".to_string(), 0, 1000),
                (String::new(), 0, 1500),
                ("c".to_string(), 1, 1000),
                (String::new(), 1, 1500),
                ("a".to_string(), 0, 100),
                ("ab".to_string(), 0, 1000),
                (String::new(), 0, 1500),
            ]
        );
    }

    #[test]
    fn test_no_sentences_yields_nothing() {
        let mut state = TypingState::new();
        assert!(state.advance(&config(&[])).is_none());
    }

    #[test]
    fn test_multibyte_characters_reveal_whole_chars() {
        let config = config(&["né"]);
        let mut state = TypingState::new();
        assert_eq!(state.advance(&config).unwrap().0.text, "n");
        assert_eq!(state.advance(&config).unwrap().0.text, "né");
        assert_eq!(state.stage(), TypingStage::PausedAfterType);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_emits_frames_on_schedule() {
        let registry = TimerRegistry::new();
        let mut animation = TypingAnimation::new(registry);
        let (tx, mut rx) = mpsc::unbounded_channel();

        animation.start(config(&["hey"]), tx, |frame| frame.text);
        assert!(animation.is_running());

        // First frame is immediate
        assert_eq!(rx.recv().await.as_deref(), Some("h"));
        assert_eq!(rx.recv().await.as_deref(), Some("he"));
        assert_eq!(rx.recv().await.as_deref(), Some("hey"));
        assert_eq!(rx.recv().await.as_deref(), Some(""));
        assert_eq!(rx.recv().await.as_deref(), Some("h"));

        animation.stop();
        assert!(!animation.is_running());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_cycle() {
        let registry = TimerRegistry::new();
        let mut animation = TypingAnimation::new(registry.clone());
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();

        animation.start(config(&["abc"]), first_tx, |frame| frame.text);
        assert_eq!(first_rx.recv().await.as_deref(), Some("a"));

        animation.start(config(&["xyz"]), second_tx, |frame| frame.text);
        assert_eq!(second_rx.recv().await.as_deref(), Some("x"));

        // The first task was aborted, so its sender is gone
        assert_eq!(first_rx.recv().await, None);
        assert_eq!(registry.active_count(), 1);
    }
}
