//! Poster Core - Headless Poster Generation Pipeline
//!
//! This crate turns a description of a fictitious movie into generated poster
//! images plus a list of similar reference movies. It is independent of any
//! UI: a terminal front-end, a web page or a test harness all drive it the
//! same way.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         UI Surface                            │
//! │            UserEvent (up)        PipelineMessage (down)       │
//! └───────────────────────────────┬──────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼──────────────────────────────┐
//! │                      PipelineController                       │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐  │
//! │  │  Typing  │  │ Progress │  │  Staged  │  │   Gallery    │  │
//! │  │Animation │  │Simulator │  │  Labels  │  │   + cursor   │  │
//! │  └──────────┘  └──────────┘  └──────────┘  └──────────────┘  │
//! │         all timers registered in one TimerRegistry            │
//! └───────────────┬───────────────────────────┬──────────────────┘
//!                 │                           │
//!         PromptBackend                 ImageBackend
//!      (POST /generate_prompt)      (hosted image queue)
//! ```
//!
//! # Key Types
//!
//! - [`PipelineController`]: state machine for one generation at a time
//! - [`UserEvent`]: events sent from the surface to the controller
//! - [`PipelineMessage`]: messages sent from the controller to the surface
//! - [`GenerationRequest`]: immutable form snapshot taken at trigger time
//! - [`Gallery`]: generated posters and the viewing cursor
//!
//! # Quick Start
//!
//! ```ignore
//! use poster_core::{
//!     load_config, FalImageBackend, GenerationRequest, HttpPromptBackend,
//!     PipelineController, UserEvent,
//! };
//! use tokio::sync::mpsc;
//!
//! let config = load_config()?;
//! let prompt = HttpPromptBackend::new(&config.backend_url, config.credential.clone());
//! let images = FalImageBackend::new(config.images.clone(), config.credential.clone());
//!
//! let (tx, mut rx) = mpsc::channel(100);
//! let mut controller = PipelineController::new(prompt, images, config.pipeline_config(), tx);
//!
//! let request = GenerationRequest::new("Nova", "A pilot crosses a storm.");
//! controller.handle_event(UserEvent::generate(request)).await;
//! controller.run_until_settled().await;
//!
//! while let Ok(msg) = rx.try_recv() {
//!     // Render message
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: prompt, image and genre backends
//! - [`cache`]: local key/value store and the genre cache
//! - [`config`]: layered TOML / environment configuration
//! - [`error`]: domain errors and failure categories
//! - [`events`]: events from the surface
//! - [`gallery`]: generated posters and cursor
//! - [`labels`]: staged loading labels
//! - [`messages`]: messages to the surface
//! - [`pipeline`]: the controller
//! - [`progress`]: simulated progress
//! - [`request`]: form state and request snapshot
//! - [`timers`]: cancellation registry for spawned tasks
//! - [`typing`]: typing placeholder animation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod labels;
pub mod messages;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod timers;
pub mod typing;

// Re-exports for convenience
pub use backend::{
    FalImageBackend, GenreCatalog, HttpGenreCatalog, HttpPromptBackend, ImageBackend,
    ImageServiceConfig, PromptBackend, PromptResult,
};
pub use cache::{default_genre, GenreCache, LocalStore};
pub use error::{FailureCategory, ImageError, PromptError};
pub use events::UserEvent;
pub use gallery::{Gallery, GeneratedArtifact};
pub use messages::{
    NotifyLevel, Percent, PipelineMessage, PipelinePhase, ProgressState, SimilarMovie,
};
pub use pipeline::{PipelineConfig, PipelineController};
pub use progress::{ProgressSimulator, SimulationHandle, SimulatorConfig};
pub use request::{FormState, GenerationRequest, PosterStyle, RequestError};
pub use timers::{TimerId, TimerRegistry};
pub use typing::{TypingAnimation, TypingConfig};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, PosterConfig, PosterToml,
};
