//! Tools the model may call while answering, currently web search.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::DEFAULT_SEARCH_BASE;
use crate::error::RemoteError;
use crate::gemini::{check_status, FunctionDeclaration};

/// A function the model can invoke through function calling.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn declaration(&self) -> FunctionDeclaration;

    async fn call(&self, args: &Value) -> Result<Value, RemoteError>;
}

// --- DuckDuckGo Instant Answer API Structures ---

#[derive(Deserialize, Debug, Default)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "Results", default)]
    results: Vec<Topic>,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<Topic>,
    },
    Single(Topic),
}

#[derive(Deserialize, Debug)]
struct Topic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
}

/// One search result handed back to the model.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl From<Topic> for SearchHit {
    fn from(topic: Topic) -> Self {
        let title = topic
            .text
            .split_once(" - ")
            .map(|(title, _)| title)
            .unwrap_or(&topic.text)
            .to_owned();
        Self {
            title,
            url: topic.first_url,
            snippet: topic.text,
        }
    }
}

impl InstantAnswer {
    fn into_hits(self, max_results: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        if !self.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: self.heading,
                url: self.abstract_url,
                snippet: self.abstract_text,
            });
        }
        let related = self.related_topics.into_iter().flat_map(|topic| match topic {
            RelatedTopic::Group { topics } => topics,
            RelatedTopic::Single(topic) => vec![topic],
        });
        hits.extend(
            self.results
                .into_iter()
                .chain(related)
                .filter(|topic| !topic.text.is_empty())
                .map(SearchHit::from),
        );
        hits.truncate(max_results);
        hits
    }
}

pub const DEFAULT_MAX_RESULTS: usize = 5;
const MAX_RESULTS_CAP: usize = 20;

/// Web search through the DuckDuckGo Instant Answer API.
#[derive(Clone, Debug)]
pub struct DuckDuckGo {
    http: Client,
    base_url: String,
}

impl Default for DuckDuckGo {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_SEARCH_BASE)
    }
}

impl DuckDuckGo {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, RemoteError> {
        info!("Searching the web for {:?}", query);
        let response = self
            .http
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;
        let response = check_status("DuckDuckGo", response).await?;

        // The API answers with a javascript content type, so decode by hand.
        let answer: InstantAnswer = serde_json::from_slice(&response.bytes().await?)?;
        let hits = answer.into_hits(max_results);
        debug!("{} search hits for {:?}", hits.len(), query);
        Ok(hits)
    }
}

#[async_trait]
impl Tool for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name().to_owned(),
            description: "Search the web with DuckDuckGo. Use it to identify places, people, \
                          products or terms seen or heard in the video."
                .to_owned(),
            parameters: json!({
                "type": "OBJECT",
                "properties": {
                    "query": { "type": "STRING", "description": "The query to search for." },
                    "max_results": {
                        "type": "INTEGER",
                        "description": "Maximum number of results to return, defaults to 5."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: &Value) -> Result<Value, RemoteError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .filter(|query| !query.trim().is_empty())
            .ok_or_else(|| RemoteError::ToolArguments {
                tool: self.name().to_owned(),
                reason: "missing string argument `query`".to_owned(),
            })?;
        let hits = self.search(query, max_results(args)).await?;
        Ok(json!({ "query": query, "results": hits }))
    }
}

/// Requested result count, clamped to `1..=MAX_RESULTS_CAP`.
fn max_results(args: &Value) -> usize {
    args.get("max_results")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_MAX_RESULTS, |n| {
            usize::try_from(n).unwrap_or(MAX_RESULTS_CAP)
        })
        .clamp(1, MAX_RESULTS_CAP)
}
