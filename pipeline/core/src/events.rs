//! User Events
//!
//! Events sent from a surface to the pipeline controller.
//!
//! # Design Philosophy
//!
//! Surfaces only report what the user did. The controller decides what it
//! means: a `Generate` during an active run is dropped, navigation on an empty
//! gallery does nothing, and everything after `Teardown` is ignored.

use serde::{Deserialize, Serialize};

use crate::request::GenerationRequest;

/// Events from a surface to the controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    /// User pressed "Generate" with this form snapshot
    Generate {
        /// Snapshot of the form at trigger time
        request: GenerationRequest,
    },

    /// Show the next poster
    NextPoster,

    /// Show the previous poster
    PreviousPoster,

    /// Surface is going away; cancel everything
    Teardown,
}

impl UserEvent {
    /// Convenience constructor for a generate event
    #[must_use]
    pub fn generate(request: GenerationRequest) -> Self {
        Self::Generate { request }
    }
}
