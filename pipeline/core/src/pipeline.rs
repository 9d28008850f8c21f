//! Pipeline Controller - The Orchestration Core
//!
//! The controller runs one poster generation end to end:
//! - prompt synthesis, with a typing placeholder while it is pending
//! - image synthesis, with simulated progress while it is pending
//! - staged loading labels and similar movies from the prompt result
//! - the gallery of generated posters and its cursor
//!
//! # Design Philosophy
//!
//! The controller is a pure event-driven state machine. It never awaits a
//! network call inside an event handler: remote calls and timers run as
//! spawned tasks registered in a [`TimerRegistry`], and report back as internal
//! events on a channel the controller owns. Every run has an id, and internal
//! events from an older run are dropped, so a superseded call or a late tick
//! cannot touch the current state.
//!
//! Surfaces talk to it through:
//! - [`UserEvent`]: actions received FROM the surface
//! - [`PipelineMessage`]: updates sent TO the surface

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::backend::{ImageBackend, PromptBackend, PromptResult};
use crate::error::{FailureCategory, ImageError, PromptError};
use crate::events::UserEvent;
use crate::gallery::{Gallery, GeneratedArtifact};
use crate::labels::{self, StagedLabel, DEFAULT_LABEL_SPACING};
use crate::messages::{
    NotifyLevel, Percent, PipelineMessage, PipelinePhase, ProgressState, SimilarMovie,
};
use crate::progress::{ProgressSimulator, ProgressTick, SimulatorConfig};
use crate::request::GenerationRequest;
use crate::timers::{TimerId, TimerRegistry};
use crate::typing::{TypingAnimation, TypingConfig, TypingFrame};

/// Controller settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Images requested per run
    pub num_images: u8,
    /// Progress simulator settings
    pub simulator: SimulatorConfig,
    /// Spacing between staged labels
    pub label_spacing: Duration,
    /// Typing placeholder settings
    pub typing: TypingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_images: 3,
            simulator: SimulatorConfig::default(),
            label_spacing: DEFAULT_LABEL_SPACING,
            typing: TypingConfig::default(),
        }
    }
}

/// Result of a spawned task, tagged with the run that spawned it
#[derive(Debug)]
struct InternalEvent {
    run: u64,
    kind: InternalKind,
}

#[derive(Debug)]
enum InternalKind {
    PromptResolved(Result<PromptResult, PromptError>),
    ImagesResolved(Result<Vec<GeneratedArtifact>, ImageError>),
    Label(StagedLabel),
    Tick(ProgressTick),
    Typing(TypingFrame),
}

/// The pipeline controller
pub struct PipelineController<P: PromptBackend, I: ImageBackend> {
    /// Configuration
    config: PipelineConfig,
    /// Prompt backend
    prompt_backend: Arc<P>,
    /// Image backend
    image_backend: Arc<I>,
    /// Channel to the surface
    tx: mpsc::Sender<PipelineMessage>,
    /// Internal events from spawned tasks
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
    internal_rx: mpsc::UnboundedReceiver<InternalEvent>,
    /// Every spawned task, for teardown
    registry: TimerRegistry,
    /// Simulated progress while images are pending
    simulator: ProgressSimulator,
    /// Placeholder while the prompt is pending
    typing: TypingAnimation,
    /// Progress owned by the controller
    progress: ProgressState,
    /// Current gallery
    gallery: Gallery,
    /// Similar movies of the current run
    similar_movies: Vec<SimilarMovie>,
    /// Current run id
    run_id: u64,
    /// Outstanding remote call
    in_flight: Option<TimerId>,
    /// Outstanding label schedule
    label_timer: Option<TimerId>,
    /// Category of the last failure
    last_failure: Option<FailureCategory>,
    /// Set by teardown
    disposed: bool,
}

impl<P: PromptBackend + 'static, I: ImageBackend + 'static> PipelineController<P, I> {
    /// Create an idle controller
    pub fn new(
        prompt_backend: P,
        image_backend: I,
        config: PipelineConfig,
        tx: mpsc::Sender<PipelineMessage>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let registry = TimerRegistry::new();

        Self {
            simulator: ProgressSimulator::new(config.simulator, registry.clone()),
            typing: TypingAnimation::new(registry.clone()),
            config,
            prompt_backend: Arc::new(prompt_backend),
            image_backend: Arc::new(image_backend),
            tx,
            internal_tx,
            internal_rx,
            registry,
            progress: ProgressState::default(),
            gallery: Gallery::new(),
            similar_movies: Vec::new(),
            run_id: 0,
            in_flight: None,
            label_timer: None,
            last_failure: None,
            disposed: false,
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> PipelinePhase {
        self.progress.phase
    }

    /// Current progress snapshot
    #[must_use]
    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    /// Current gallery
    #[must_use]
    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Similar movies of the current run
    #[must_use]
    pub fn similar_movies(&self) -> &[SimilarMovie] {
        &self.similar_movies
    }

    /// Category of the most recent failure, cleared by a new run
    #[must_use]
    pub fn last_failure(&self) -> Option<FailureCategory> {
        self.last_failure
    }

    /// Whether teardown has run
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of spawned tasks still running
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.registry.active_count()
    }

    // ============================================
    // Surface events
    // ============================================

    /// Process one surface event
    pub async fn handle_event(&mut self, event: UserEvent) {
        if self.disposed {
            tracing::debug!(?event, "Ignoring event after teardown");
            return;
        }

        match event {
            UserEvent::Generate { request } => self.start_generation(request).await,
            UserEvent::NextPoster => {
                if self.gallery.next() {
                    self.send_cursor().await;
                }
            }
            UserEvent::PreviousPoster => {
                if self.gallery.previous() {
                    self.send_cursor().await;
                }
            }
            UserEvent::Teardown => self.teardown(),
        }
    }

    /// Cancel every outstanding task and stop accepting events
    pub fn teardown(&mut self) {
        if self.disposed {
            return;
        }
        self.registry.dispose();
        self.typing.stop();
        if let Some(handle) = self.simulator.active() {
            self.simulator.stop(handle);
        }
        self.in_flight = None;
        self.label_timer = None;
        self.run_id += 1;
        self.disposed = true;
        tracing::info!(phase = ?self.progress.phase, "Pipeline torn down");
    }

    async fn start_generation(&mut self, request: GenerationRequest) {
        if self.progress.phase.is_busy() {
            tracing::warn!(phase = ?self.progress.phase, "Generation already running, ignoring trigger");
            self.notify(
                NotifyLevel::Warning,
                None,
                "A generation is already in progress",
            )
            .await;
            return;
        }

        if let Err(e) = request.validate() {
            tracing::debug!(error = %e, "Rejected generation request");
            self.notify(NotifyLevel::Warning, None, &e.to_string()).await;
            return;
        }

        self.run_id += 1;
        let run = self.run_id;
        self.cancel_labels();
        self.last_failure = None;
        tracing::info!(run, title = %request.title, genre = %request.genre, "Starting generation");

        self.gallery.clear();
        self.send(PipelineMessage::Gallery {
            artifacts: Vec::new(),
            cursor: 0,
        })
        .await;
        self.similar_movies.clear();
        self.send(PipelineMessage::SimilarMovies { movies: Vec::new() })
            .await;
        self.progress.loading_labels.clear();

        self.set_phase(PipelinePhase::AwaitingPrompt).await;
        self.set_percent(Percent::Indeterminate).await;

        self.typing.start(
            self.config.typing.clone(),
            self.internal_tx.clone(),
            move |frame| InternalEvent {
                run,
                kind: InternalKind::Typing(frame),
            },
        );

        let backend = Arc::clone(&self.prompt_backend);
        let tx = self.internal_tx.clone();
        self.in_flight = Some(self.registry.spawn(async move {
            let result = backend.acquire(&request).await;
            let _ = tx.send(InternalEvent {
                run,
                kind: InternalKind::PromptResolved(result),
            });
        }));
    }

    // ============================================
    // Internal events
    // ============================================

    /// Process every internal event that is ready, without waiting
    ///
    /// Returns true if there was activity.
    pub async fn poll_internal(&mut self) -> bool {
        let mut activity = false;
        while let Ok(event) = self.internal_rx.try_recv() {
            self.process_internal(event).await;
            activity = true;
        }
        activity
    }

    /// Wait for one internal event and process it
    ///
    /// Returns false immediately after teardown.
    pub async fn next_internal(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        match self.internal_rx.recv().await {
            Some(event) => {
                self.process_internal(event).await;
                true
            }
            None => false,
        }
    }

    /// Process internal events until no run is in flight
    pub async fn run_until_settled(&mut self) -> PipelinePhase {
        while !self.disposed && (self.progress.phase.is_busy() || self.in_flight.is_some()) {
            if !self.next_internal().await {
                break;
            }
        }
        self.progress.phase
    }

    /// Main loop: surface events and internal events until teardown
    pub async fn run(&mut self, mut events_rx: mpsc::Receiver<UserEvent>) {
        loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(UserEvent::Teardown) | None => {
                        self.teardown();
                        break;
                    }
                    Some(event) => self.handle_event(event).await,
                },
                Some(event) = self.internal_rx.recv() => {
                    self.process_internal(event).await;
                }
            }
        }
    }

    async fn process_internal(&mut self, event: InternalEvent) {
        if self.disposed || event.run != self.run_id {
            tracing::debug!(run = event.run, current = self.run_id, "Dropping stale event");
            return;
        }

        match event.kind {
            InternalKind::PromptResolved(result) => self.on_prompt(result).await,
            InternalKind::ImagesResolved(result) => self.on_images(result).await,
            InternalKind::Label(label) => self.on_label(label).await,
            InternalKind::Tick(tick) => self.on_tick(tick).await,
            InternalKind::Typing(frame) => {
                if self.progress.phase == PipelinePhase::AwaitingPrompt {
                    self.send(PipelineMessage::Placeholder { text: frame.text })
                        .await;
                }
            }
        }
    }

    async fn on_prompt(&mut self, result: Result<PromptResult, PromptError>) {
        if self.progress.phase != PipelinePhase::AwaitingPrompt {
            return;
        }
        self.in_flight = None;
        self.typing.stop();

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                self.fail(e.category(), e.to_string()).await;
                return;
            }
        };
        let Some(prompt) = result.usable_prompt().map(str::to_string) else {
            let e = PromptError::IncompleteResult;
            self.fail(e.category(), e.to_string()).await;
            return;
        };

        let run = self.run_id;
        tracing::info!(
            run,
            labels = result.loading_updates.len(),
            similar = result.movie_titles.len(),
            "Prompt acquired"
        );

        self.label_timer = labels::schedule(
            &self.registry,
            result.loading_updates.clone(),
            self.config.label_spacing,
            self.internal_tx.clone(),
            move |label| InternalEvent {
                run,
                kind: InternalKind::Label(label),
            },
        );

        self.similar_movies = result.similar_movies();
        self.send(PipelineMessage::SimilarMovies {
            movies: self.similar_movies.clone(),
        })
        .await;

        self.set_phase(PipelinePhase::AwaitingImages).await;
        self.set_percent(Percent::of(0)).await;
        self.simulator.start(self.internal_tx.clone(), move |tick| InternalEvent {
            run,
            kind: InternalKind::Tick(tick),
        });

        let backend = Arc::clone(&self.image_backend);
        let tx = self.internal_tx.clone();
        let count = self.config.num_images;
        self.in_flight = Some(self.registry.spawn(async move {
            let result = backend.invoke(&prompt, count).await;
            let _ = tx.send(InternalEvent {
                run,
                kind: InternalKind::ImagesResolved(result),
            });
        }));
    }

    async fn on_images(&mut self, result: Result<Vec<GeneratedArtifact>, ImageError>) {
        if self.progress.phase != PipelinePhase::AwaitingImages {
            return;
        }
        self.in_flight = None;
        if let Some(handle) = self.simulator.active() {
            self.simulator.stop(handle);
        }

        match result {
            Ok(artifacts) => {
                if artifacts.is_empty() {
                    tracing::info!(run = self.run_id, "Image service returned no images");
                }
                self.set_percent(Percent::of(100)).await;
                self.gallery.replace(artifacts);
                self.send(PipelineMessage::Gallery {
                    artifacts: self.gallery.artifacts().to_vec(),
                    cursor: self.gallery.cursor(),
                })
                .await;
                self.set_phase(PipelinePhase::Complete).await;
                tracing::info!(run = self.run_id, posters = self.gallery.len(), "Generation complete");
            }
            Err(e) => self.fail(e.category(), e.to_string()).await,
        }
    }

    async fn on_label(&mut self, label: StagedLabel) {
        if self.progress.phase.is_terminal() {
            return;
        }
        // Labels come from the prompt result, so they only ever arrive while
        // images are pending; the simulator owns `percent` then.
        self.progress.loading_labels.push(label.label.clone());
        self.send(PipelineMessage::LoadingLabel {
            label: label.label,
            index: label.index,
            total: label.total,
            percent: label.percent,
        })
        .await;
    }

    async fn on_tick(&mut self, tick: ProgressTick) {
        if self.progress.phase != PipelinePhase::AwaitingImages
            || !self.simulator.is_active(tick.handle)
        {
            return;
        }
        let current = self.progress.percent.value().unwrap_or(0);
        self.set_percent(Percent::of(current.max(tick.percent))).await;
    }

    async fn fail(&mut self, category: FailureCategory, detail: String) {
        self.typing.stop();
        if let Some(handle) = self.simulator.active() {
            self.simulator.stop(handle);
        }
        self.in_flight = None;
        self.last_failure = Some(category);

        tracing::warn!(run = self.run_id, %category, detail = %detail, "Generation failed");
        self.notify(NotifyLevel::Error, Some(category.label()), &detail)
            .await;
        // Terminal phase is the last message of a run
        self.set_phase(PipelinePhase::Failed).await;
    }

    fn cancel_labels(&mut self) {
        if let Some(id) = self.label_timer.take() {
            self.registry.cancel(id);
        }
    }

    // ============================================
    // Output helpers
    // ============================================

    /// Set phase and notify the surface
    async fn set_phase(&mut self, phase: PipelinePhase) {
        self.progress.phase = phase;
        self.send(PipelineMessage::Phase { phase }).await;
    }

    /// Set percent and notify the surface when it changed
    async fn set_percent(&mut self, percent: Percent) {
        if self.progress.percent != percent {
            self.progress.percent = percent;
            self.send(PipelineMessage::Progress { percent }).await;
        }
    }

    async fn send_cursor(&self) {
        if let Some(artifact) = self.gallery.current() {
            self.send(PipelineMessage::Cursor {
                index: self.gallery.cursor(),
                artifact: artifact.clone(),
            })
            .await;
        }
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, title: Option<&str>, message: &str) {
        self.send(PipelineMessage::Notify {
            level,
            title: title.map(ToString::to_string),
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the surface
    async fn send(&self, msg: PipelineMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

impl<P: PromptBackend, I: ImageBackend> Drop for PipelineController<P, I> {
    fn drop(&mut self) {
        self.registry.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoPrompt;

    #[async_trait]
    impl PromptBackend for EchoPrompt {
        fn name(&self) -> &str {
            "echo"
        }

        async fn acquire(&self, request: &GenerationRequest) -> Result<PromptResult, PromptError> {
            Ok(PromptResult::with_prompt(format!("poster for {}", request.title)))
        }
    }

    struct OneImage;

    #[async_trait]
    impl ImageBackend for OneImage {
        fn name(&self) -> &str {
            "one"
        }

        async fn invoke(
            &self,
            prompt: &str,
            _count: u8,
        ) -> Result<Vec<GeneratedArtifact>, ImageError> {
            Ok(vec![GeneratedArtifact::new(format!("https://img.test/{}", prompt.len()))])
        }
    }

    #[tokio::test]
    async fn test_controller_creation() {
        let (tx, _rx) = mpsc::channel(100);
        let controller = PipelineController::new(EchoPrompt, OneImage, PipelineConfig::default(), tx);

        assert_eq!(controller.phase(), PipelinePhase::Idle);
        assert_eq!(controller.progress().percent, Percent::of(0));
        assert!(controller.gallery().is_empty());
        assert!(!controller.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_runs_to_complete() {
        let (tx, mut rx) = mpsc::channel(1024);
        let mut controller =
            PipelineController::new(EchoPrompt, OneImage, PipelineConfig::default(), tx);

        controller
            .handle_event(UserEvent::generate(GenerationRequest::new("Nova", "Storm.")))
            .await;
        assert_eq!(controller.phase(), PipelinePhase::AwaitingPrompt);

        assert_eq!(controller.run_until_settled().await, PipelinePhase::Complete);
        assert_eq!(controller.gallery().len(), 1);
        assert_eq!(controller.progress().percent, Percent::of(100));

        let mut phases = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let PipelineMessage::Phase { phase } = msg {
                phases.push(phase);
            }
        }
        assert_eq!(
            phases,
            vec![
                PipelinePhase::AwaitingPrompt,
                PipelinePhase::AwaitingImages,
                PipelinePhase::Complete
            ]
        );
    }

    #[tokio::test]
    async fn test_events_ignored_after_teardown() {
        let (tx, _rx) = mpsc::channel(100);
        let mut controller =
            PipelineController::new(EchoPrompt, OneImage, PipelineConfig::default(), tx);

        controller.handle_event(UserEvent::Teardown).await;
        assert!(controller.is_disposed());

        controller
            .handle_event(UserEvent::generate(GenerationRequest::new("Nova", "Storm.")))
            .await;
        assert_eq!(controller.phase(), PipelinePhase::Idle);
        assert!(!controller.next_internal().await);
    }
}
