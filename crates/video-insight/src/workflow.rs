//! One analysis attempt: stage, upload, wait, compose, run, clean up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::agent::{AnalysisAgent, AnalysisRequest, AnalysisResponse};
use crate::config::ReadinessPolicy;
use crate::error::{ReadinessError, ValidationError, WorkflowError};
use crate::media::{MediaStore, ScratchVideo, UploadedVideo};
use crate::poller::await_ready;
use crate::prompt::{compose, PromptStyle, UserQuery};

/// States an attempt moves through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    FileReceived,
    Uploading,
    AwaitingReady,
    Composing,
    Running,
    Done,
    Rejected,
    Failed,
    TimedOut,
}

#[derive(Debug)]
pub enum Outcome {
    Done(AnalysisResponse),
    Rejected(ValidationError),
    Failed(WorkflowError),
    TimedOut {
        name: String,
        attempts: u32,
        waited: Duration,
    },
}

impl Outcome {
    fn state(&self) -> AttemptState {
        match self {
            Self::Done(_) => AttemptState::Done,
            Self::Rejected(_) => AttemptState::Rejected,
            Self::Failed(_) => AttemptState::Failed,
            Self::TimedOut { .. } => AttemptState::TimedOut,
        }
    }
}

/// What happened during one attempt.
#[derive(Debug)]
pub struct AttemptReport {
    pub trajectory: Vec<AttemptState>,
    pub outcome: Outcome,
    /// Where the video was staged. Already deleted when the report is returned.
    pub scratch_path: Option<PathBuf>,
}

impl AttemptReport {
    pub fn final_state(&self) -> AttemptState {
        self.outcome.state()
    }
}

struct Trajectory(Vec<AttemptState>);

impl Trajectory {
    fn new() -> Self {
        Self(vec![AttemptState::Idle])
    }

    fn enter(&mut self, state: AttemptState) {
        debug!("{:?} -> {:?}", self.0.last(), state);
        self.0.push(state);
    }

    fn finish(mut self, outcome: Outcome, scratch_path: Option<PathBuf>) -> AttemptReport {
        self.enter(outcome.state());
        AttemptReport {
            trajectory: self.0,
            outcome,
            scratch_path,
        }
    }
}

/// Runs attempts against an injected media store and agent.
pub struct Orchestrator {
    store: Arc<dyn MediaStore>,
    agent: Arc<dyn AnalysisAgent>,
    policy: ReadinessPolicy,
    prompt_style: PromptStyle,
    scratch_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn MediaStore>, agent: Arc<dyn AnalysisAgent>) -> Self {
        Self {
            store,
            agent,
            policy: ReadinessPolicy::default(),
            prompt_style: PromptStyle::default(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_prompt_style(mut self, style: PromptStyle) -> Self {
        self.prompt_style = style;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Runs one attempt to completion. The staged copy of `video` is gone on return.
    pub async fn analyze(&self, video: UploadedVideo, query: &str) -> AttemptReport {
        let mut trajectory = Trajectory::new();

        let scratch = match ScratchVideo::stage(&self.scratch_dir, &video) {
            Ok(scratch) => scratch,
            Err(err) => {
                warn!("Could not stage {}: {}", video.display_name(), err);
                return trajectory.finish(Outcome::Failed(WorkflowError::Scratch(err)), None);
            }
        };
        let scratch_path = scratch.path().to_path_buf();
        trajectory.enter(AttemptState::FileReceived);

        let outcome = self.drive(&mut trajectory, &scratch, &video, query).await;

        if let Err(err) = scratch.discard() {
            warn!("Could not remove {}: {}", scratch_path.display(), err);
        } else {
            debug!("Removed {}", scratch_path.display());
        }
        trajectory.finish(outcome, Some(scratch_path))
    }

    async fn drive(
        &self,
        trajectory: &mut Trajectory,
        scratch: &ScratchVideo,
        video: &UploadedVideo,
        query: &str,
    ) -> Outcome {
        let query = match UserQuery::parse(query) {
            Ok(query) => query,
            Err(err) => return Outcome::Rejected(err),
        };

        trajectory.enter(AttemptState::Uploading);
        let handle = match self
            .store
            .upload(scratch.path(), video.format, &video.display_name())
            .await
        {
            Ok(handle) => handle,
            Err(err) => return Outcome::Failed(WorkflowError::Upload(err)),
        };

        trajectory.enter(AttemptState::AwaitingReady);
        let ready = match await_ready(self.store.as_ref(), handle, &self.policy).await {
            Ok(ready) => ready,
            Err(ReadinessError::TimedOut {
                name,
                attempts,
                waited,
            }) => {
                warn!("Gave up on {} after {} polls", name, attempts);
                return Outcome::TimedOut {
                    name,
                    attempts,
                    waited,
                };
            }
            Err(err) => return Outcome::Failed(WorkflowError::Readiness(err)),
        };

        trajectory.enter(AttemptState::Composing);
        let instruction = compose(self.prompt_style, &query);

        trajectory.enter(AttemptState::Running);
        let request = AnalysisRequest {
            instruction,
            media: vec![ready],
        };
        match self.agent.run(request).await {
            Ok(response) => {
                info!("Analysis complete, {} characters", response.content.len());
                Outcome::Done(response)
            }
            Err(err) => Outcome::Failed(WorkflowError::Run(err)),
        }
    }
}
