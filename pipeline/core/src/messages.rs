//! Pipeline Messages
//!
//! Messages sent from the pipeline controller to UI surfaces. A surface is a
//! pure renderer: it shows what these messages say and forwards user actions
//! back as [`crate::events::UserEvent`]s.

use serde::{Deserialize, Serialize};

use crate::gallery::GeneratedArtifact;

/// Messages from the controller to a surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PipelineMessage {
    // ============================================
    // Progress
    // ============================================
    /// Phase changed
    Phase {
        /// The new phase
        phase: PipelinePhase,
    },

    /// Displayed progress changed
    Progress {
        /// Current percent
        percent: Percent,
    },

    /// A staged loading label was revealed
    LoadingLabel {
        /// Label text
        label: String,
        /// Zero-based position in the label schedule
        index: usize,
        /// Number of labels in the schedule
        total: usize,
        /// Share of the schedule revealed so far, 0-100
        percent: u8,
    },

    /// Typing-animation frame shown during an indeterminate wait
    Placeholder {
        /// Text revealed so far
        text: String,
    },

    // ============================================
    // Results
    // ============================================
    /// Reference movies similar to the request
    SimilarMovies {
        /// Movies in backend order
        movies: Vec<SimilarMovie>,
    },

    /// Gallery was replaced
    Gallery {
        /// All artifacts of the run
        artifacts: Vec<GeneratedArtifact>,
        /// Cursor after replacement (always 0)
        cursor: usize,
    },

    /// Gallery cursor moved
    Cursor {
        /// New cursor
        index: usize,
        /// Artifact under the cursor
        artifact: GeneratedArtifact,
    },

    // ============================================
    // System
    // ============================================
    /// User-visible notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Title (optional)
        title: Option<String>,
        /// Message content
        message: String,
    },
}

/// Macro-state of a generation run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PipelinePhase {
    /// Nothing running
    #[default]
    Idle,
    /// Waiting for the prompt backend
    AwaitingPrompt,
    /// Waiting for the image service
    AwaitingImages,
    /// Run finished (possibly with zero images)
    Complete,
    /// Run failed
    Failed,
}

impl PipelinePhase {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::AwaitingPrompt => "Generating prompt...",
            Self::AwaitingImages => "Generating posters...",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Whether a run is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::AwaitingPrompt | Self::AwaitingImages)
    }

    /// Whether the run has ended
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Progress percentage, or the indeterminate sentinel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Percent {
    /// True progress unknown
    Indeterminate,
    /// Known progress (0-100)
    Determinate(u8),
}

impl Percent {
    /// Determinate percent clamped to 100
    #[must_use]
    pub fn of(value: u8) -> Self {
        Self::Determinate(value.min(100))
    }

    /// Numeric value, if determinate
    #[must_use]
    pub fn value(self) -> Option<u8> {
        match self {
            Self::Indeterminate => None,
            Self::Determinate(v) => Some(v),
        }
    }

    /// Text progress bar (`#` filled, `-` empty)
    #[must_use]
    pub fn progress_bar(self, width: usize) -> String {
        let filled = self.value().map_or(0, |v| (v as usize * width) / 100);
        let empty = width.saturating_sub(filled);

        format!("{}{}", "#".repeat(filled), "-".repeat(empty))
    }
}

impl Default for Percent {
    fn default() -> Self {
        Self::Determinate(0)
    }
}

/// Progress snapshot owned by the controller
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Current phase
    pub phase: PipelinePhase,
    /// Current percent
    pub percent: Percent,
    /// Staged labels revealed so far in this run
    pub loading_labels: Vec<String>,
}

/// A reference movie returned alongside the prompt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarMovie {
    /// Movie title
    pub title: String,
    /// Director name
    pub director: String,
}

impl SimilarMovie {
    /// Create a similar-movie entry
    pub fn new(title: impl Into<String>, director: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            director: director.into(),
        }
    }
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Success
    Success,
}
