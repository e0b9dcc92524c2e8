//! Minimal Gemini REST client: the Files API and `generateContent`.

use std::path::Path;

use async_trait::async_trait;
use humansize::{format_size, DECIMAL};
use log::{debug, info};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::config::ApiKey;
use crate::error::RemoteError;
use crate::media::{MediaState, MediaStore, RemoteMediaHandle, VideoFormat};

// --- Files API Structures ---

#[derive(Deserialize, Debug)]
struct UploadResponse {
    file: FileResource,
}

/// A file as described by the Files API.
#[derive(Deserialize, Debug, Clone)]
pub struct FileResource {
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub state: FileState,
    #[serde(default)]
    pub error: Option<FileError>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileState {
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "FAILED")]
    Failed,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FileError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl From<FileResource> for RemoteMediaHandle {
    fn from(file: FileResource) -> Self {
        let state = match file.state {
            FileState::Processing => MediaState::Processing,
            FileState::Active => MediaState::Ready,
            FileState::Failed => MediaState::Failed,
            FileState::Unspecified => MediaState::Unspecified,
        };
        Self {
            name: file.name,
            uri: file.uri,
            mime_type: file.mime_type,
            state,
            failure: file.error.map(|e| format!("(Code {}) {}", e.code, e.message)),
        }
    }
}

// --- generateContent Structures ---

#[derive(Serialize, Debug, Clone)]
pub struct GenerateContentRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: &str, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role.to_owned()),
            parts,
        }
    }

    /// A role-less content block, as used for system instructions.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "fileData", default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    #[serde(rename = "functionCall", default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(rename = "functionResponse", default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn file(mime_type: &str, file_uri: &str) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type: mime_type.to_owned(),
                file_uri: file_uri.to_owned(),
            }),
            ..Self::default()
        }
    }

    pub fn function_response(name: &str, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.to_owned(),
                response,
            }),
            ..Self::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "fileUri")]
    pub file_uri: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Serialize, Debug, Clone)]
pub struct ToolSpec {
    #[serde(rename = "functionDeclarations")]
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

// --- Client ---

/// Shared Gemini client. Built once per process.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl GeminiClient {
    pub fn with_base_url(api_key: ApiKey, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Uploads a local file with the resumable upload protocol.
    pub async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileResource, RemoteError> {
        let io_error = |source| RemoteError::Io {
            path: path.display().to_string(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_error)?.len();
        info!("Uploading {} ({})", display_name, format_size(size, DECIMAL));

        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .query(&[("key", self.api_key.expose())])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = check_status("Gemini Files API", start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .ok_or(RemoteError::MissingUploadUrl)?
            .to_owned();
        debug!("Upload session granted for {}", display_name);

        let file = File::open(path).await.map_err(io_error)?;
        let body = Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));
        let finished = self
            .http
            .post(&upload_url)
            .header(CONTENT_LENGTH, size)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(body)
            .send()
            .await?;
        let finished = check_status("Gemini Files API", finished).await?;

        let uploaded: UploadResponse = serde_json::from_slice(&finished.bytes().await?)?;
        info!("Uploaded {} as {}", display_name, uploaded.file.name);
        Ok(uploaded.file)
    }

    /// Fetches the current metadata of `name` (e.g. `files/abc123`).
    pub async fn get_file(&self, name: &str) -> Result<FileResource, RemoteError> {
        let response = self
            .http
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .query(&[("key", self.api_key.expose())])
            .send()
            .await?;
        let response = check_status("Gemini Files API", response).await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RemoteError> {
        let model = model.trim_start_matches("models/");
        let response = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .query(&[("key", self.api_key.expose())])
            .json(request)
            .send()
            .await?;
        let response = check_status("Gemini generateContent", response).await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }
}

#[async_trait]
impl MediaStore for GeminiClient {
    async fn upload(
        &self,
        path: &Path,
        format: VideoFormat,
        display_name: &str,
    ) -> Result<RemoteMediaHandle, RemoteError> {
        let file = self.upload_file(path, format.mime_type(), display_name).await?;
        Ok(file.into())
    }

    async fn fetch(&self, name: &str) -> Result<RemoteMediaHandle, RemoteError> {
        Ok(self.get_file(name).await?.into())
    }
}

/// Turns a non-2xx response into [`RemoteError::Status`] carrying the body.
pub(crate) async fn check_status(
    service: &'static str,
    response: Response,
) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error body".to_string());
    Err(RemoteError::Status {
        service,
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_states_map_onto_media_states() {
        let file: FileResource = serde_json::from_value(json!({
            "name": "files/abc",
            "mimeType": "video/mp4",
            "uri": "https://example.test/files/abc",
            "state": "ACTIVE"
        }))
        .unwrap();
        let handle = RemoteMediaHandle::from(file);
        assert_eq!(handle.state, MediaState::Ready);
        assert_eq!(handle.name, "files/abc");

        let file: FileResource =
            serde_json::from_value(json!({ "name": "files/x", "state": "STATE_UNSPECIFIED" }))
                .unwrap();
        assert_eq!(file.state, FileState::Unspecified);

        let file: FileResource = serde_json::from_value(json!({ "name": "files/y" })).unwrap();
        assert_eq!(file.state, FileState::Unspecified);
    }

    #[test]
    fn failed_files_keep_their_reason() {
        let file: FileResource = serde_json::from_value(json!({
            "name": "files/bad",
            "state": "FAILED",
            "error": { "code": 3, "message": "unsupported codec" }
        }))
        .unwrap();
        let handle = RemoteMediaHandle::from(file);
        assert_eq!(handle.state, MediaState::Failed);
        assert_eq!(handle.failure.as_deref(), Some("(Code 3) unsupported codec"));
    }

    #[test]
    fn parts_serialize_in_camel_case_without_empty_fields() {
        let request = GenerateContentRequest {
            system_instruction: Some(Content::instruction("be brief")),
            contents: vec![Content::new(
                "user",
                vec![Part::file("video/mp4", "https://x/files/1"), Part::text("what?")],
            )],
            tools: vec![],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "systemInstruction": { "parts": [{ "text": "be brief" }] },
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "fileData": { "mimeType": "video/mp4", "fileUri": "https://x/files/1" } },
                        { "text": "what?" }
                    ]
                }]
            })
        );
    }

    #[test]
    fn candidates_without_content_still_decode() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(response.candidates[0].content.is_none());
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("SAFETY"));
    }
}
