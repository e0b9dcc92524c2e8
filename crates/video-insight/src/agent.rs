//! The analysis agent: one Gemini model, optional tools, one answer.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::config::DEFAULT_MODEL;
use crate::error::RemoteError;
use crate::gemini::{Content, GeminiClient, GenerateContentRequest, Part, ToolSpec};
use crate::media::ReadyMedia;
use crate::search::Tool;

/// Agent settings, fixed at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub web_search: bool,
    pub markdown: bool,
    pub max_tool_rounds: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Video AI Summarizer".to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            web_search: true,
            markdown: true,
            max_tool_rounds: 4,
        }
    }
}

impl AgentConfig {
    fn system_instruction(&self) -> String {
        let mut lines = vec![format!("Your name is {}.", self.name)];
        if self.web_search {
            lines.push(
                "When the video alone is not enough, use the web search tool to look up \
                 places, people, products or terms, and mention what you found."
                    .to_owned(),
            );
        }
        if self.markdown {
            lines.push("Use markdown to format your answers.".to_owned());
        }
        lines.join("\n")
    }
}

/// An instruction plus the media it refers to. Consumed by one run.
#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub instruction: String,
    pub media: Vec<ReadyMedia>,
}

/// The model's answer, rendered as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisResponse {
    pub content: String,
    pub model: String,
    pub tool_calls: u32,
}

#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    async fn run(&self, request: AnalysisRequest) -> Result<AnalysisResponse, RemoteError>;
}

/// [`AnalysisAgent`] backed by Gemini `generateContent` with function calling.
pub struct GeminiAgent {
    client: Arc<GeminiClient>,
    config: AgentConfig,
    tools: Vec<Box<dyn Tool>>,
}

impl GeminiAgent {
    /// Builds an agent. `tools` are only offered when `config.web_search` is set.
    pub fn new(client: Arc<GeminiClient>, config: AgentConfig, tools: Vec<Box<dyn Tool>>) -> Self {
        let tools = if config.web_search { tools } else { Vec::new() };
        Self {
            client,
            config,
            tools,
        }
    }

    fn tool_specs(&self) -> Vec<ToolSpec> {
        if self.tools.is_empty() {
            return Vec::new();
        }
        vec![ToolSpec {
            function_declarations: self.tools.iter().map(|tool| tool.declaration()).collect(),
        }]
    }

    fn tool(&self, name: &str) -> Result<&dyn Tool, RemoteError> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| &**tool)
            .ok_or_else(|| RemoteError::UnknownTool(name.to_owned()))
    }
}

#[async_trait]
impl AnalysisAgent for GeminiAgent {
    async fn run(&self, request: AnalysisRequest) -> Result<AnalysisResponse, RemoteError> {
        let mut parts: Vec<Part> = request
            .media
            .iter()
            .map(|media| Part::file(media.mime_type(), media.uri()))
            .collect();
        parts.push(Part::text(request.instruction));

        let mut body = GenerateContentRequest {
            system_instruction: Some(Content::instruction(self.config.system_instruction())),
            contents: vec![Content::new("user", parts)],
            tools: self.tool_specs(),
        };

        let mut tool_calls = 0;
        for round in 0..=self.config.max_tool_rounds {
            info!("Asking {} (round {})", self.config.model, round + 1);
            let response = self.client.generate_content(&self.config.model, &body).await?;
            let candidate = response
                .candidates
                .into_iter()
                .next()
                .ok_or(RemoteError::EmptyResponse)?;
            let Some(content) = candidate.content else {
                warn!("Candidate has no content, finish reason {:?}", candidate.finish_reason);
                return Err(RemoteError::EmptyResponse);
            };

            let calls: Vec<_> = content
                .parts
                .iter()
                .filter_map(|part| part.function_call.clone())
                .collect();

            if calls.is_empty() {
                let text: String = content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect();
                if text.trim().is_empty() {
                    return Err(RemoteError::EmptyResponse);
                }
                return Ok(AnalysisResponse {
                    content: text,
                    model: self.config.model.clone(),
                    tool_calls,
                });
            }

            if round == self.config.max_tool_rounds {
                break;
            }

            let mut replies = Vec::with_capacity(calls.len());
            for call in calls {
                debug!("Model called {} with {}", call.name, call.args);
                let output = self.tool(&call.name)?.call(&call.args).await?;
                replies.push(Part::function_response(&call.name, output));
                tool_calls += 1;
            }
            body.contents.push(Content {
                role: Some("model".to_owned()),
                ..content
            });
            body.contents.push(Content::new("user", replies));
        }

        Err(RemoteError::ToolRoundsExhausted(self.config.max_tool_rounds))
    }
}
