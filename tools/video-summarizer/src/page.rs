//! HTML for the single page UI.

use pulldown_cmark::{html, Event, Options, Parser};
use pulldown_cmark_escape::escape_html;

pub const UPLOAD_PROMPT: &str = "📁 Upload a video file to begin analysis.";

/// What to show under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Nothing to analyze yet.
    Info(String),
    Warning(String),
    Error(String),
    /// The model's answer, as markdown.
    Answer(String),
}

const STYLE: &str = r#"
body { background: #0e1117; color: #fafafa; font-family: sans-serif; }
.block-container { display: flex; flex-direction: column; align-items: center; justify-content: center; padding-top: 2rem; max-width: 60rem; margin: 0 auto; }
h1, h3 { text-align: center; }
form { display: flex; flex-direction: column; gap: 1rem; width: 100%; }
textarea { height: 100px; text-align: center; }
button { display: block; margin: 0 auto; padding: .5rem 1.5rem; }
video { max-width: 100%; }
.banner { padding: 1rem; border-radius: .5rem; width: 100%; box-sizing: border-box; }
.info { background: #1c3a5e; }
.warning { background: #5e4b1c; }
.error { background: #5e1c1c; }
.result { width: 100%; }
#spinner[hidden] { display: none; }
"#;

const SCRIPT: &str = r#"
document.getElementById('video').addEventListener('change', (event) => {
  const file = event.target.files[0];
  const preview = document.getElementById('preview');
  if (file) {
    preview.src = URL.createObjectURL(file);
    preview.hidden = false;
  }
});
document.getElementById('analyze').addEventListener('submit', () => {
  document.getElementById('spinner').hidden = false;
});
"#;

pub fn render(model: &str, query: &str, view: &View) -> String {
    let outcome = match view {
        View::Info(message) => banner("info", message),
        View::Warning(message) => banner("warning", &format!("⚠️ {message}")),
        View::Error(message) => banner("error", &format!("❌ {message}")),
        View::Answer(markdown) => format!(
            "<section class=\"result\"><h2>📊 Analysis Result</h2>{}</section>",
            markdown_to_html(markdown)
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Multimodal AI Agent - Video Summarizer</title>
<style>{STYLE}</style>
</head>
<body>
<main class="block-container">
<h1>VIDEO SUMMARIZER AGENT 🎥🎤</h1>
<h3>Powered by {model}</h3>
<form id="analyze" method="post" action="/analyze" enctype="multipart/form-data">
<label>📤 Upload a video file <input id="video" type="file" name="video" accept=".mp4,.mov,.avi"></label>
<video id="preview" controls hidden></video>
<hr>
<label for="query">🔎 What insights are you seeking from the video?</label>
<textarea id="query" name="query" placeholder="Ask anything about the video content." title="Provide specific questions or topics of interest.">{query}</textarea>
<button type="submit">🔍 Analyze Video</button>
<p id="spinner" hidden>⏳ Processing video and gathering insights...</p>
</form>
{outcome}
</main>
<script>{SCRIPT}</script>
</body>
</html>
"#,
        model = escape(model),
        query = escape(query),
    )
}

fn banner(kind: &str, message: &str) -> String {
    format!("<div class=\"banner {kind}\">{}</div>", escape(message))
}

/// Renders the answer. Raw HTML from the model is shown as text.
fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        event => event,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String never fails.
    let _ = escape_html(&mut out, text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_prompts_for_upload() {
        let page = render("gemini-2.0-flash-exp", "", &View::Info(UPLOAD_PROMPT.into()));
        assert!(page.contains("Powered by gemini-2.0-flash-exp"));
        assert!(page.contains(r#"<div class="banner info">📁 Upload a video file to begin analysis.</div>"#));
        assert!(page.contains(r#"accept=".mp4,.mov,.avi""#));
    }

    #[test]
    fn answers_render_markdown() {
        let page = render("m", "q", &View::Answer("**Key Events**\n\n- a cat".into()));
        assert!(page.contains("<strong>Key Events</strong>"));
        assert!(page.contains("<li>a cat</li>"));
    }

    #[test]
    fn raw_html_in_answers_is_escaped() {
        let html = markdown_to_html("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn query_and_banners_are_escaped() {
        let page = render("m", "</textarea><b>", &View::Error("<boom>".into()));
        assert!(page.contains("&lt;/textarea&gt;&lt;b&gt;</textarea>"));
        assert!(page.contains("❌ &lt;boom&gt;"));
    }

    #[test]
    fn warnings_use_the_warning_banner() {
        let page = render("m", "", &View::Warning("Please enter a question".into()));
        assert!(page.contains(r#"<div class="banner warning">⚠️ Please enter a question</div>"#));
    }
}
