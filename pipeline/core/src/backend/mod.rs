//! Remote Backends
//!
//! The controller only sees the traits; concrete HTTP clients live here too.
//!
//! # Available Backends
//!
//! - **Prompt**: `POST /generate_prompt` on the prompt service
//! - **Images**: hosted image queue (submit, poll status, fetch result)
//! - **Genres**: `GET /get_available_genres` on the prompt service
//!
//! # Usage
//!
//! ```ignore
//! use poster_core::backend::{HttpPromptBackend, PromptBackend};
//!
//! let backend = HttpPromptBackend::new("http://127.0.0.1:8000/api", Some(key));
//! let result = backend.acquire(&request).await?;
//! ```

mod genres;
mod images;
mod prompt;
mod traits;

pub use genres::HttpGenreCatalog;
pub use images::{
    FalImageBackend, ImageServiceConfig, DEFAULT_IMAGE_SIZE, DEFAULT_MODEL, DEFAULT_QUEUE_URL,
};
pub use prompt::HttpPromptBackend;
pub use traits::{GenreCatalog, ImageBackend, PromptBackend, PromptResult};
