use std::time::Duration;

use thiserror::Error;

/// Startup problems. These are fatal: nothing may talk to the remote side.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    MissingCredential { var: &'static str },
}

/// Problems with user input. Recoverable by correcting the input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please enter a question or insight to analyze the video")]
    EmptyQuery,
    #[error("unsupported video format {0:?}, expected one of mp4, mov, avi")]
    UnsupportedFormat(String),
}

/// Any failure while talking to Gemini or the search tool.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("upload session was not granted, x-goog-upload-url is missing")]
    MissingUploadUrl,
    #[error("model returned no text")]
    EmptyResponse,
    #[error("model asked for unknown tool {0:?}")]
    UnknownTool(String),
    #[error("invalid arguments for tool {tool}: {reason}")]
    ToolArguments { tool: String, reason: String },
    #[error("model kept calling tools after {0} rounds")]
    ToolRoundsExhausted(u32),
}

/// Why an uploaded file never became usable.
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("remote processing of {name} failed: {reason}")]
    Failed { name: String, reason: String },
    #[error("{name} left processing in an unrecognized state")]
    Unrecognized { name: String },
    #[error("{name} still processing after {attempts} polls ({waited:?})")]
    TimedOut {
        name: String,
        attempts: u32,
        waited: Duration,
    },
}

/// Failure of one analysis attempt, keyed by the stage that failed.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to stage the video locally: {0}")]
    Scratch(#[source] std::io::Error),
    #[error("upload failed: {0}")]
    Upload(#[source] RemoteError),
    #[error("video processing failed: {0}")]
    Readiness(#[source] ReadinessError),
    #[error("analysis failed: {0}")]
    Run(#[source] RemoteError),
}
