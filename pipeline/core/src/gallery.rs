//! Poster Gallery
//!
//! Ordered, cursor-addressed view over the artifacts of the latest run.
//! The gallery is only ever replaced wholesale; navigation clamps at both ends
//! and never wraps.

use serde::{Deserialize, Serialize};

/// One generated poster image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Location of the generated image
    pub image_url: String,
}

impl GeneratedArtifact {
    /// Create an artifact from an image URL
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
        }
    }
}

/// Gallery of generated posters with a viewing cursor
///
/// Invariant: `cursor < artifacts.len()` whenever the gallery is non-empty,
/// and `cursor == 0` when it is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gallery {
    artifacts: Vec<GeneratedArtifact>,
    cursor: usize,
}

impl Gallery {
    /// Empty gallery
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all artifacts and reset the cursor
    pub fn replace(&mut self, artifacts: Vec<GeneratedArtifact>) {
        self.artifacts = artifacts;
        self.cursor = 0;
    }

    /// Drop all artifacts
    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Move to the next artifact; returns whether the cursor moved
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.artifacts.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous artifact; returns whether the cursor moved
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Artifact under the cursor
    #[must_use]
    pub fn current(&self) -> Option<&GeneratedArtifact> {
        self.artifacts.get(self.cursor)
    }

    /// Cursor position
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// All artifacts in order
    #[must_use]
    pub fn artifacts(&self) -> &[GeneratedArtifact] {
        &self.artifacts
    }

    /// Number of artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the gallery is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
