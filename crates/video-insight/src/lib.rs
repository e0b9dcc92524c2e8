//! Ask questions about a video with Gemini.
//!
//! The flow for one attempt is: stage the video on disk, upload it with the
//! Files API, wait until the remote side has processed it, wrap the user's
//! question in an instruction, and let the agent answer, optionally searching
//! the web along the way. See [`workflow::Orchestrator`].

pub mod agent;
pub mod config;
pub mod error;
pub mod gemini;
pub mod media;
pub mod poller;
pub mod prompt;
pub mod search;
pub mod workflow;

pub use agent::{AgentConfig, AnalysisAgent, AnalysisRequest, AnalysisResponse, GeminiAgent};
pub use config::{ApiKey, ReadinessPolicy};
pub use error::{ConfigError, ReadinessError, RemoteError, ValidationError, WorkflowError};
pub use gemini::GeminiClient;
pub use media::{MediaState, MediaStore, ReadyMedia, RemoteMediaHandle, UploadedVideo, VideoFormat};
pub use prompt::{PromptStyle, UserQuery};
pub use search::{DuckDuckGo, Tool};
pub use workflow::{AttemptReport, AttemptState, Orchestrator, Outcome};
