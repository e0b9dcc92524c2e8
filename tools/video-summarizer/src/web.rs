//! Browser UI: one page, one form, one analysis per submission.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use color_eyre::eyre::{Result, WrapErr};
use log::{info, warn};
use tokio::net::TcpListener;
use video_insight::{AttemptReport, Orchestrator, Outcome, UploadedVideo};

use crate::page::{self, View};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    model: Arc<str>,
}

pub fn router(orchestrator: Arc<Orchestrator>, model: &str, max_upload_bytes: usize) -> Router {
    let state = AppState {
        orchestrator,
        model: model.into(),
    };
    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub async fn serve(router: Router, listen: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .wrap_err_with(|| format!("Failed to bind to {listen}"))?;
    info!("Video summarizer listening on http://{listen}");
    axum::serve(listener, router)
        .await
        .wrap_err("Video summarizer server failed")
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render(&state.model, "", &upload_prompt()))
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Default)]
struct AnalyzeForm {
    video: Option<(String, Bytes)>,
    query: String,
}

async fn read_form(multipart: &mut Multipart) -> Result<AnalyzeForm> {
    let mut form = AnalyzeForm::default();
    while let Some(field) = multipart.next_field().await.wrap_err("Malformed form data")? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "video" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.wrap_err("Failed to read the video")?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    form.video = Some((file_name, bytes));
                }
            }
            "query" => {
                form.query = field.text().await.wrap_err("Failed to read the query")?;
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn analyze(State(state): State<AppState>, mut multipart: Multipart) -> Html<String> {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!("Rejected upload: {err:#}");
            return Html(page::render(
                &state.model,
                "",
                &View::Error(format!("Could not read the upload: {err:#}")),
            ));
        }
    };

    let view = match form.video {
        None => upload_prompt(),
        Some((file_name, bytes)) => match UploadedVideo::from_file_name(&file_name, bytes) {
            Ok(video) => {
                info!("Analyzing {}", file_name);
                let report = state.orchestrator.analyze(video, &form.query).await;
                info!("Attempt went through {:?}", report.trajectory);
                view_for(report)
            }
            Err(err) => View::Warning(capitalize(&err.to_string())),
        },
    };
    Html(page::render(&state.model, &form.query, &view))
}

fn upload_prompt() -> View {
    View::Info(page::UPLOAD_PROMPT.to_owned())
}

fn view_for(report: AttemptReport) -> View {
    match report.outcome {
        Outcome::Done(response) => {
            info!(
                "Answered by {} after {} tool calls",
                response.model, response.tool_calls
            );
            View::Answer(response.content)
        }
        Outcome::Rejected(err) => View::Warning(capitalize(&err.to_string())),
        Outcome::Failed(err) => {
            warn!("Analysis failed: {err}");
            View::Error(format!("An error occurred during analysis: {err}"))
        }
        Outcome::TimedOut { waited, .. } => View::Error(format!(
            "The video was still processing after {waited:?}. Please try again."
        )),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;
    use video_insight::{
        AnalysisAgent, AnalysisRequest, AnalysisResponse, AttemptState, MediaState, MediaStore,
        RemoteError, RemoteMediaHandle, ValidationError, VideoFormat, WorkflowError,
    };

    use super::*;

    const BOUNDARY: &str = "video-summarizer-boundary";

    /// Media store and agent that count every remote call.
    #[derive(Default)]
    struct CountingRemote {
        fail_upload: bool,
        uploads: AtomicU32,
        fetches: AtomicU32,
        runs: AtomicU32,
    }

    impl CountingRemote {
        fn calls(&self) -> u32 {
            self.uploads.load(Ordering::SeqCst)
                + self.fetches.load(Ordering::SeqCst)
                + self.runs.load(Ordering::SeqCst)
        }
    }

    fn ready_handle() -> RemoteMediaHandle {
        RemoteMediaHandle {
            name: "files/clip".into(),
            uri: "https://files.test/files/clip".into(),
            mime_type: "video/mp4".into(),
            state: MediaState::Ready,
            failure: None,
        }
    }

    #[async_trait]
    impl MediaStore for CountingRemote {
        async fn upload(
            &self,
            _: &Path,
            _: VideoFormat,
            _: &str,
        ) -> Result<RemoteMediaHandle, RemoteError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if self.fail_upload {
                return Err(RemoteError::MissingUploadUrl);
            }
            Ok(ready_handle())
        }

        async fn fetch(&self, _: &str) -> Result<RemoteMediaHandle, RemoteError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(ready_handle())
        }
    }

    #[async_trait]
    impl AnalysisAgent for CountingRemote {
        async fn run(&self, _: AnalysisRequest) -> Result<AnalysisResponse, RemoteError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResponse {
                content: "**A cat** chases a laser pointer.".into(),
                model: "gemini-test".into(),
                tool_calls: 0,
            })
        }
    }

    fn analyze_request(video: Option<(&str, &[u8])>, query: &str) -> Request<Body> {
        let mut body = Vec::new();
        if let Some((file_name, bytes)) = video {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; \
                     filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\n\
                 {query}\r\n--{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );
        Request::post("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(remote: &Arc<CountingRemote>, request: Request<Body>) -> String {
        let orchestrator = Arc::new(Orchestrator::new(remote.clone(), remote.clone()));
        let response = router(orchestrator, "gemini-test", 1024 * 1024)
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_asks_for_a_video() {
        let remote = Arc::new(CountingRemote::default());
        let page = send(&remote, Request::get("/").body(Body::empty()).unwrap()).await;
        assert!(page.contains("Powered by gemini-test"));
        assert!(page.contains(r#"<div class="banner info">📁 Upload a video file"#));
    }

    #[tokio::test]
    async fn submitted_video_is_answered() {
        let remote = Arc::new(CountingRemote::default());
        let request = analyze_request(
            Some(("clip.mp4", b"five seconds of video")),
            "What is happening in this video?",
        );
        let page = send(&remote, request).await;

        assert!(page.contains("📊 Analysis Result"));
        assert!(page.contains("<strong>A cat</strong> chases a laser pointer."));
        assert!(page.contains(">What is happening in this video?</textarea>"));
        assert_eq!(remote.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(remote.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(remote.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_file_part_asks_for_a_video() {
        let remote = Arc::new(CountingRemote::default());
        let page = send(&remote, analyze_request(Some(("", b"")), "What?")).await;
        assert!(page.contains(r#"<div class="banner info">📁 Upload a video file"#));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn unsupported_extension_is_a_warning() {
        let remote = Arc::new(CountingRemote::default());
        let page = send(&remote, analyze_request(Some(("clip.mkv", b"video")), "What?")).await;
        assert!(page.contains(r#"<div class="banner warning">⚠️ Unsupported video format"#));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn blank_query_is_a_warning_without_remote_calls() {
        let remote = Arc::new(CountingRemote::default());
        let page = send(&remote, analyze_request(Some(("clip.mp4", b"video")), "   ")).await;
        assert!(page.contains(
            r#"<div class="banner warning">⚠️ Please enter a question or insight to analyze the video</div>"#
        ));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn upload_error_shows_the_error_banner() {
        let remote = Arc::new(CountingRemote {
            fail_upload: true,
            ..CountingRemote::default()
        });
        let page = send(&remote, analyze_request(Some(("clip.mov", b"video")), "Who?")).await;
        assert!(page.contains(r#"<div class="banner error">❌ An error occurred during analysis: upload failed"#));
        assert_eq!(remote.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(remote.runs.load(Ordering::SeqCst), 0);
    }

    fn report(outcome: Outcome) -> AttemptReport {
        AttemptReport {
            trajectory: vec![AttemptState::Idle],
            outcome,
            scratch_path: None,
        }
    }

    #[test]
    fn answers_are_shown_verbatim() {
        let view = view_for(report(Outcome::Done(AnalysisResponse {
            content: "# Summary".into(),
            model: "m".into(),
            tool_calls: 0,
        })));
        assert_eq!(view, View::Answer("# Summary".into()));
    }

    #[test]
    fn empty_queries_become_warnings() {
        let view = view_for(report(Outcome::Rejected(ValidationError::EmptyQuery)));
        assert_eq!(
            view,
            View::Warning("Please enter a question or insight to analyze the video".into())
        );
    }

    #[test]
    fn failures_become_a_generic_banner() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let view = view_for(report(Outcome::Failed(WorkflowError::Scratch(err))));
        let View::Error(message) = view else {
            panic!("expected an error banner");
        };
        assert!(message.starts_with("An error occurred during analysis:"));
        assert!(message.contains("disk full"));
    }

    #[test]
    fn timeouts_become_an_error_banner() {
        let view = view_for(report(Outcome::TimedOut {
            name: "files/clip".into(),
            attempts: 3,
            waited: Duration::from_secs(3),
        }));
        assert!(matches!(view, View::Error(message) if message.contains("3s")));
    }
}
