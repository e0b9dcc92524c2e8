use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::info;
use video_insight::config::{DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_SEARCH_BASE};
use video_insight::{
    AgentConfig, ApiKey, ConfigError, DuckDuckGo, GeminiAgent, GeminiClient, Orchestrator,
    PromptStyle, ReadinessPolicy, Tool,
};

/// Ask Gemini questions about a short video, optionally backed by web search.
#[derive(Parser, Debug)]
#[command(name = "video-summarizer", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze one video file and print the answer.
    Analyze {
        /// An .mp4, .mov or .avi file.
        video: PathBuf,

        /// What you want to know about the video.
        #[arg(short, long)]
        query: String,
    },
    /// Serve the browser UI.
    Serve {
        #[arg(long, env = "VIDEO_INSIGHT_LISTEN", default_value = "127.0.0.1:8501")]
        listen: SocketAddr,

        /// Largest accepted upload, in megabytes.
        #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..=4096))]
        max_upload_mb: u64,
    },
}

#[derive(Args, Debug)]
pub struct Settings {
    /// Gemini API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "VIDEO_INSIGHT_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    #[arg(long, env = "VIDEO_INSIGHT_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    pub api_base: String,

    #[arg(long, env = "VIDEO_INSIGHT_SEARCH_BASE", default_value = DEFAULT_SEARCH_BASE, global = true)]
    pub search_base: String,

    /// Do not let the model search the web.
    #[arg(long, global = true)]
    pub no_search: bool,

    /// Ask for plain text instead of markdown.
    #[arg(long, global = true)]
    pub plain: bool,

    /// Delay between checks while the upload is processing.
    #[arg(long, default_value_t = 1000, global = true)]
    pub poll_interval_ms: u64,

    /// Checks before giving up on a processing upload.
    #[arg(long, default_value_t = 600, global = true)]
    pub max_polls: u32,

    /// `insight` for a narrative answer, `structured` for a sectioned report.
    #[arg(long, default_value_t = PromptStyle::Insight, global = true)]
    pub prompt_style: PromptStyle,

    #[arg(long, default_value_t = 4, global = true)]
    pub max_tool_rounds: u32,

    /// Where uploads are staged. Defaults to the system temp dir.
    #[arg(long, global = true)]
    pub scratch_dir: Option<PathBuf>,
}

/// Megabytes to bytes, saturating at `usize::MAX`.
pub fn max_upload_bytes(mb: u64) -> usize {
    usize::try_from(mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
}

impl Settings {
    /// Resolves the credential, then builds the orchestrator.
    ///
    /// Nothing that can reach the network exists unless the key is present.
    pub fn startup(&self) -> Result<Orchestrator, ConfigError> {
        let api_key = self.api_key()?;
        info!(
            "Using {} with web search {}, waiting up to {:?} for uploads to process",
            self.model,
            if self.no_search { "off" } else { "on" },
            self.readiness_policy().budget()
        );
        Ok(self.orchestrator(api_key))
    }

    pub fn api_key(&self) -> Result<ApiKey, ConfigError> {
        ApiKey::from_lookup(|_| self.api_key.clone())
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            web_search: !self.no_search,
            markdown: !self.plain,
            max_tool_rounds: self.max_tool_rounds,
            ..AgentConfig::default()
        }
    }

    pub fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy::new(Duration::from_millis(self.poll_interval_ms), self.max_polls)
    }

    /// Wires the client, agent and orchestrator. Called once per process.
    pub fn orchestrator(&self, api_key: ApiKey) -> Orchestrator {
        let client = Arc::new(GeminiClient::with_base_url(api_key, &self.api_base));
        let tools: Vec<Box<dyn Tool>> = vec![Box::new(DuckDuckGo::with_base_url(&self.search_base))];
        let agent = GeminiAgent::new(client.clone(), self.agent_config(), tools);

        let orchestrator = Orchestrator::new(client, Arc::new(agent))
            .with_policy(self.readiness_policy())
            .with_prompt_style(self.prompt_style);
        match &self.scratch_dir {
            Some(dir) => orchestrator.with_scratch_dir(dir),
            None => orchestrator,
        }
    }
}
