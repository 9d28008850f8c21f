//! Generation Requests
//!
//! [`FormState`] is the mutable form collaborator a surface edits field by
//! field. When the user presses "Generate" the controller receives an
//! immutable [`GenerationRequest`] snapshot; nothing downstream reads the form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Poster styles understood by the prompt backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PosterStyle {
    /// Rendered 3D artwork
    DigitalArt3d,
    /// Photographic, face-forward poster
    RealisticPhotography,
    /// Flat illustration
    IllustrationAnimated,
}

impl PosterStyle {
    /// All styles, in dropdown order
    pub const ALL: [Self; 3] = [
        Self::DigitalArt3d,
        Self::RealisticPhotography,
        Self::IllustrationAnimated,
    ];

    /// Wire / display value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DigitalArt3d => "3D Digital Art",
            Self::RealisticPhotography => "Realistic Photography",
            Self::IllustrationAnimated => "Illustration (Animated)",
        }
    }

    /// Parse a display value (case-insensitive)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for PosterStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reasons a request cannot start a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Title is empty or whitespace
    #[error("movie title cannot be empty")]
    EmptyTitle,
    /// Plot is empty or whitespace
    #[error("movie plot cannot be empty")]
    EmptyPlot,
}

/// Immutable snapshot of the form taken when generation starts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Movie title
    pub title: String,
    /// Movie plot
    pub plot: String,
    /// Genre (may be empty)
    pub genre: String,
    /// Poster style display value (may be empty)
    pub style: String,
    /// Restrict reference movies to the retro era
    #[serde(rename = "isRetro")]
    pub is_retro: bool,
}

impl GenerationRequest {
    /// Create a request with title and plot; other fields default
    pub fn new(title: impl Into<String>, plot: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            plot: plot.into(),
            genre: String::new(),
            style: String::new(),
            is_retro: false,
        }
    }

    /// Set genre
    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    /// Set style
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Set retro flag
    #[must_use]
    pub fn with_retro(mut self, is_retro: bool) -> Self {
        self.is_retro = is_retro;
        self
    }

    /// Check the required fields
    ///
    /// # Errors
    ///
    /// Returns the first empty required field (title before plot).
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.title.trim().is_empty() {
            return Err(RequestError::EmptyTitle);
        }
        if self.plot.trim().is_empty() {
            return Err(RequestError::EmptyPlot);
        }
        Ok(())
    }
}

/// Mutable form state edited by a surface
#[derive(Clone, Debug, Default)]
pub struct FormState {
    title: String,
    plot: String,
    genre: String,
    style: String,
    is_retro: bool,
}

impl FormState {
    /// Empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current plot
    #[must_use]
    pub fn plot(&self) -> &str {
        &self.plot
    }

    /// Current genre
    #[must_use]
    pub fn genre(&self) -> &str {
        &self.genre
    }

    /// Current style
    #[must_use]
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Current retro flag
    #[must_use]
    pub fn is_retro(&self) -> bool {
        self.is_retro
    }

    /// Set title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Set plot
    pub fn set_plot(&mut self, plot: impl Into<String>) {
        self.plot = plot.into();
    }

    /// Set genre
    pub fn set_genre(&mut self, genre: impl Into<String>) {
        self.genre = genre.into();
    }

    /// Set style
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.style = style.into();
    }

    /// Set retro flag
    pub fn set_retro(&mut self, is_retro: bool) {
        self.is_retro = is_retro;
    }

    /// Set retro flag from the dropdown value ("True" / "False")
    pub fn set_retro_choice(&mut self, choice: &str) {
        self.is_retro = choice.trim().eq_ignore_ascii_case("true");
    }

    /// Whether the generate action should be enabled
    #[must_use]
    pub fn can_generate(&self) -> bool {
        !self.title.trim().is_empty() && !self.plot.trim().is_empty()
    }

    /// Take an immutable snapshot of the current values
    #[must_use]
    pub fn snapshot(&self) -> GenerationRequest {
        GenerationRequest {
            title: self.title.clone(),
            plot: self.plot.clone(),
            genre: self.genre.clone(),
            style: self.style.clone(),
            is_retro: self.is_retro,
        }
    }
}
