//! Release pipeline: resolve the version, build that version, push that build.
//!
//! The pipeline is strictly linear. Each step is awaited to completion before
//! the next starts, the version is resolved exactly once, and the reference
//! returned by the build is the one pushed.
//!
//! ```text
//! Start -> Resolving -> Building -> Pushing -> Done
//!              \            \           \
//!               +------------+-----------+--> Failed
//! ```

use crate::error::{ReleaseError, Result};
use crate::image::{self, BuildEngine, ImageReference, RegistryClient};
use crate::metadata::MetadataProvider;
use crate::version::{self, Version};
use chrono::{DateTime, Utc};
use std::fmt;

/// Phase of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing has run yet
    Start,
    /// Querying project metadata
    Resolving,
    /// Building the image
    Building,
    /// Uploading the image
    Pushing,
    /// All steps succeeded
    Done,
    /// A step failed; nothing after it ran
    Failed,
}

impl PipelineState {
    /// `Done` and `Failed` end a run
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::Resolving => "resolving",
            PipelineState::Building => "building",
            PipelineState::Pushing => "pushing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of a successful release
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    /// Reference that was built and pushed
    pub reference: ImageReference,
    /// When version resolution started
    pub started_at: DateTime<Utc>,
    /// When the push completed
    pub finished_at: DateTime<Utc>,
}

impl ReleaseOutcome {
    /// Wall-clock duration of the run
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// One release run over three collaborators.
///
/// A pipeline value runs at most once; retrying means constructing a new
/// pipeline, which resolves the version again.
pub struct ReleasePipeline<'a, M, B, R> {
    image_name: &'a str,
    metadata: &'a M,
    engine: &'a B,
    registry: &'a R,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl<'a, M, B, R> ReleasePipeline<'a, M, B, R>
where
    M: MetadataProvider,
    B: BuildEngine,
    R: RegistryClient,
{
    /// Create a pipeline in the `Start` state
    pub fn new(image_name: &'a str, metadata: &'a M, engine: &'a B, registry: &'a R) -> Self {
        Self {
            image_name,
            metadata,
            engine,
            registry,
            state: PipelineState::Start,
            history: vec![PipelineState::Start],
        }
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, in order, starting with `Start`
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn enter(&mut self, next: PipelineState) {
        log::debug!("Release pipeline: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Run resolve, build and push in order, stopping at the first failure.
    pub async fn run(&mut self) -> Result<ReleaseOutcome> {
        if self.state != PipelineState::Start {
            return Err(ReleaseError::AlreadyRan {
                state: self.state.to_string(),
            });
        }

        let started_at = Utc::now();
        match self.run_steps().await {
            Ok(reference) => {
                self.enter(PipelineState::Done);
                Ok(ReleaseOutcome {
                    reference,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(e) => {
                log::error!("Release failed while {}: {}", self.state, e);
                self.enter(PipelineState::Failed);
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self) -> Result<ImageReference> {
        self.enter(PipelineState::Resolving);
        let version: Version = version::resolve_version(self.metadata).await?;

        self.enter(PipelineState::Building);
        let reference = image::build_image(self.engine, self.image_name, &version).await?;

        self.enter(PipelineState::Pushing);
        image::push_image(self.registry, &reference).await?;

        Ok(reference)
    }
}

/// Resolve, build and push `image_name` in one run.
pub async fn release<M, B, R>(
    image_name: &str,
    metadata: &M,
    engine: &B,
    registry: &R,
) -> Result<ReleaseOutcome>
where
    M: MetadataProvider,
    B: BuildEngine,
    R: RegistryClient,
{
    ReleasePipeline::new(image_name, metadata, engine, registry)
        .run()
        .await
}
