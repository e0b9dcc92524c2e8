//! Builds the instruction sent alongside the video.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The user's question about the video. Never blank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserQuery(String);

impl UserQuery {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let query = raw.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        Ok(Self(query.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const INSIGHT_TEMPLATE: &str = r#"
Analyze the uploaded video for visual and contextual insights.
Respond to the following user query using detailed reasoning, key observations,
and additional knowledge as needed:

{user_query}

Output a comprehensive, user-friendly, and informative response.
"#;

const STRUCTURED_TEMPLATE: &str = r#"
You are a multimodal AI assistant designed to summarize and analyze video content.

### Instructions:
1. Watch the uploaded video carefully.
2. Identify and summarize the key scenes, visual elements, and events.
3. Extract any spoken or displayed text, dialogues, or relevant audio cues.
4. Combine all insights to answer the user query below.
5. Perform supplementary web research if needed (e.g., identifying known places, people, or terms).
6. Provide your answer in this structured format:
- **Key Events Timeline**
- **Main Characters or Subjects**
- **Summary of Visual & Audio Content**
- **Insights Related to the User Query**
- **Relevant External Information or Context**
- **Actionable Takeaways or Suggestions**

### User Query:
{user_query}

Please ensure the response is comprehensive, easy to read, and well-organized.
"#;

/// Which instruction template to wrap the query in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PromptStyle {
    /// Free-form narrative insight.
    #[default]
    Insight,
    /// Sectioned report: timeline, subjects, audio/visual summary, takeaways.
    Structured,
}

impl PromptStyle {
    fn template(self) -> &'static str {
        match self {
            Self::Insight => INSIGHT_TEMPLATE,
            Self::Structured => STRUCTURED_TEMPLATE,
        }
    }
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "insight" => Ok(Self::Insight),
            "structured" => Ok(Self::Structured),
            other => Err(format!("unknown prompt style {other:?}, expected insight or structured")),
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insight => "insight",
            Self::Structured => "structured",
        })
    }
}

/// Interpolates `query` into the template for `style`.
pub fn compose(style: PromptStyle, query: &UserQuery) -> String {
    style
        .template()
        .replace("{user_query}", query.as_str())
        .trim()
        .to_owned()
}
