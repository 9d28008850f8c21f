//! Display State
//!
//! The terminal surface is a thin client: it renders what the controller
//! tells it to. [`DisplayState`] folds [`PipelineMessage`]s into the state
//! needed for rendering and yields the lines to print.

use poster_core::{
    GeneratedArtifact, NotifyLevel, Percent, PipelineMessage, PipelinePhase, SimilarMovie,
};

/// Width of the textual progress bar
const BAR_WIDTH: usize = 30;

/// A line produced by applying a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayLine {
    /// Overwrites the current status line (placeholder, progress)
    Status(String),
    /// Printed on its own line and kept
    Persistent(String),
}

/// Rendering state derived from pipeline messages
#[derive(Clone, Debug, Default)]
pub struct DisplayState {
    /// Last phase seen
    pub phase: PipelinePhase,
    /// Last percent seen
    pub percent: Percent,
    /// Posters of the current run
    pub artifacts: Vec<GeneratedArtifact>,
    /// Index of the poster on screen
    pub cursor: usize,
    /// Similar movies of the current run
    pub similar_movies: Vec<SimilarMovie>,
}

impl DisplayState {
    /// Create an empty display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the run has ended and navigation makes sense
    pub fn is_settled(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Apply a message and return the lines to print
    pub fn apply_message(&mut self, msg: PipelineMessage) -> Vec<DisplayLine> {
        match msg {
            PipelineMessage::Phase { phase } => {
                self.phase = phase;
                match phase {
                    PipelinePhase::Idle => Vec::new(),
                    PipelinePhase::Complete if self.artifacts.is_empty() => vec![
                        DisplayLine::Persistent("No posters were generated.".to_string()),
                    ],
                    _ => vec![DisplayLine::Persistent(format!("== {phase}"))],
                }
            }
            PipelineMessage::Progress { percent } => {
                self.percent = percent;
                vec![DisplayLine::Status(progress_line(percent))]
            }
            PipelineMessage::LoadingLabel {
                label,
                index,
                total,
                percent,
            } => {
                vec![DisplayLine::Persistent(format!(
                    "  [{}/{} {percent:>3}%] {label}",
                    index + 1,
                    total
                ))]
            }
            PipelineMessage::Placeholder { text } => vec![DisplayLine::Status(text)],
            PipelineMessage::SimilarMovies { movies } => {
                self.similar_movies = movies;
                if self.similar_movies.is_empty() {
                    return Vec::new();
                }
                let mut lines = vec![DisplayLine::Persistent("Similar movies:".to_string())];
                lines.extend(self.similar_movies.iter().map(|movie| {
                    if movie.director.is_empty() {
                        DisplayLine::Persistent(format!("  - {}", movie.title))
                    } else {
                        DisplayLine::Persistent(format!("  - {} ({})", movie.title, movie.director))
                    }
                }));
                lines
            }
            PipelineMessage::Gallery { artifacts, cursor } => {
                self.artifacts = artifacts;
                self.cursor = cursor;
                match self.artifacts.get(cursor) {
                    Some(artifact) => vec![DisplayLine::Persistent(poster_line(
                        cursor,
                        self.artifacts.len(),
                        artifact,
                    ))],
                    None => Vec::new(),
                }
            }
            PipelineMessage::Cursor { index, artifact } => {
                self.cursor = index;
                vec![DisplayLine::Persistent(poster_line(
                    index,
                    self.artifacts.len(),
                    &artifact,
                ))]
            }
            PipelineMessage::Notify {
                level,
                title,
                message,
            } => {
                let prefix = notify_prefix(level);
                let line = match title {
                    Some(title) => format!("{prefix} {title}: {message}"),
                    None => format!("{prefix} {message}"),
                };
                vec![DisplayLine::Persistent(line)]
            }
        }
    }
}

/// Progress bar plus numeric percent (or a spinner-free "working" marker)
pub fn progress_line(percent: Percent) -> String {
    match percent.value() {
        Some(value) => format!("[{}] {value:>3}%", percent.progress_bar(BAR_WIDTH)),
        None => format!("[{}]  ...", percent.progress_bar(BAR_WIDTH)),
    }
}

/// One poster with its position in the gallery
pub fn poster_line(index: usize, total: usize, artifact: &GeneratedArtifact) -> String {
    format!("Poster {}/{}: {}", index + 1, total.max(1), artifact.image_url)
}

fn notify_prefix(level: NotifyLevel) -> &'static str {
    match level {
        NotifyLevel::Info => "[info]",
        NotifyLevel::Warning => "[warn]",
        NotifyLevel::Error => "[error]",
        NotifyLevel::Success => "[ok]",
    }
}
