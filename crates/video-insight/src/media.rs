//! Local and remote representations of the video being analyzed.

use std::io::{self, Write};
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempPath;

use crate::error::{RemoteError, ValidationError};

/// Container formats accepted for upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VideoFormat {
    Mp4,
    Mov,
    Avi,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 3] = [VideoFormat::Mp4, VideoFormat::Mov, VideoFormat::Avi];

    pub fn from_extension(ext: &str) -> Result<Self, ValidationError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mov" => Ok(Self::Mov),
            "avi" => Ok(Self::Avi),
            _ => Err(ValidationError::UnsupportedFormat(ext.to_owned())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        Self::from_extension(ext)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mov => "video/quicktime",
            Self::Avi => "video/x-msvideo",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Mp4 => ".mp4",
            Self::Mov => ".mov",
            Self::Avi => ".avi",
        }
    }
}

/// A video the user handed us, held in memory until it is staged on disk.
#[derive(Clone, Debug)]
pub struct UploadedVideo {
    pub bytes: Bytes,
    pub format: VideoFormat,
    pub display_name: Option<String>,
}

impl UploadedVideo {
    pub fn new(bytes: impl Into<Bytes>, format: VideoFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
            display_name: None,
        }
    }

    /// Builds a video from a user supplied file name, rejecting unknown extensions.
    pub fn from_file_name(file_name: &str, bytes: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let format = VideoFormat::from_path(Path::new(file_name))?;
        Ok(Self::new(bytes, format).with_display_name(file_name))
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("video.{}", self.format.extension()))
    }
}

/// The on-disk copy of an [`UploadedVideo`]. Removed when discarded or dropped.
#[derive(Debug)]
pub struct ScratchVideo {
    path: TempPath,
}

impl ScratchVideo {
    /// Writes `video` to a randomly named file in `dir`.
    pub fn stage(dir: &Path, video: &UploadedVideo) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("video-")
            .suffix(video.format.suffix())
            .tempfile_in(dir)?;
        file.write_all(&video.bytes)?;
        file.flush()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file, reporting failures instead of swallowing them.
    pub fn discard(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Remote processing state of an uploaded file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaState {
    Processing,
    Ready,
    Failed,
    Unspecified,
}

/// Reference to a file held by the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteMediaHandle {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    pub state: MediaState,
    pub failure: Option<String>,
}

/// A handle observed in [`MediaState::Ready`]. Only the readiness poller hands these out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyMedia(RemoteMediaHandle);

impl ReadyMedia {
    pub(crate) fn new(handle: RemoteMediaHandle) -> Self {
        debug_assert_eq!(handle.state, MediaState::Ready);
        Self(handle)
    }

    pub fn handle(&self) -> &RemoteMediaHandle {
        &self.0
    }

    pub fn uri(&self) -> &str {
        &self.0.uri
    }

    pub fn mime_type(&self) -> &str {
        &self.0.mime_type
    }
}

/// Remote file storage: upload, then look files up by name.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        path: &Path,
        format: VideoFormat,
        display_name: &str,
    ) -> Result<RemoteMediaHandle, RemoteError>;

    async fn fetch(&self, name: &str) -> Result<RemoteMediaHandle, RemoteError>;
}
