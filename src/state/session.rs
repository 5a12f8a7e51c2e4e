//! The upload session: the only stateful piece of the application.
//!
//! All mutation happens here, driven by user events (drop, pick, reset,
//! URL submit) and by request outcomes. Views only read from it.
//!
//! Every accepted file or URL bumps a session token. Outcomes carry the token
//! of the request that produced them, so a result that arrives after a reset
//! or replacement is discarded instead of overwriting the newer state.

use iced::widget::image::Handle;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::data::{Payload, ProcessedResult, SelectedFile, UploadRequest};
use super::policy::UploadPolicy;
use crate::error::{UploadError, ValidationError};

/// Which panel is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Uploading,
    Success,
    Failed,
}

/// Visible state as plain values (no image handles)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub file_name: Option<String>,
    pub has_result: bool,
    pub last_error: Option<String>,
    pub dragging: bool,
}

/// The processed result plus its displayable handle
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub result: ProcessedResult,
    /// Present for image results
    pub preview: Option<Handle>,
}

/// Upload workflow controller
#[derive(Debug)]
pub struct UploadSession {
    policy: UploadPolicy,
    /// Current session token, bumped on every accept and reset
    token: u64,
    source_file: Option<SelectedFile>,
    original_preview: Option<Handle>,
    result: Option<SessionResult>,
    uploading: bool,
    last_error: Option<String>,
    dragging: bool,
    /// False in the URL-reference variant: drops and picks are ignored
    file_input: bool,
    /// A picked or dropped file is being read from disk
    reading: bool,
}

impl UploadSession {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            policy,
            token: 0,
            source_file: None,
            original_preview: None,
            result: None,
            uploading: false,
            last_error: None,
            dragging: false,
            file_input: true,
            reading: false,
        }
    }

    /// Enable or disable picked and dropped files
    pub fn with_file_input(mut self, enabled: bool) -> Self {
        self.file_input = enabled;
        self
    }

    pub fn accepts_files(&self) -> bool {
        self.file_input
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn phase(&self) -> Phase {
        if self.uploading {
            Phase::Uploading
        } else if self.last_error.is_some() {
            Phase::Failed
        } else if self.result.is_some() {
            Phase::Success
        } else {
            Phase::Idle
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            file_name: self.source_file.as_ref().map(|f| f.name.clone()),
            has_result: self.result.is_some(),
            last_error: self.last_error.clone(),
            dragging: self.dragging,
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn source_file(&self) -> Option<&SelectedFile> {
        self.source_file.as_ref()
    }

    pub fn original_preview(&self) -> Option<&Handle> {
        self.original_preview.as_ref()
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop Target highlight while a file hovers the window
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging && self.file_input && !self.uploading;
    }

    /// Claim the single read slot for a picked or dropped file.
    ///
    /// Returns `false` when the file must be ignored: file input is off,
    /// a request is in flight, or another file is still being read.
    pub fn begin_read(&mut self, path: &Path) -> bool {
        self.dragging = false;

        if !self.file_input {
            warn!("⚠️  Files are not accepted in URL mode, ignoring {}", path.display());
            return false;
        }
        if self.uploading {
            warn!("Upload in progress, ignoring {}", path.display());
            return false;
        }
        if self.reading {
            warn!("Still reading the previous file, ignoring {}", path.display());
            return false;
        }

        debug!("Reading {}", path.display());
        self.reading = true;
        true
    }

    /// Validate a picked or dropped file and start the upload.
    ///
    /// Returns the request to run, or `None` when nothing must be sent
    /// (validation failed, or a request is already in flight).
    pub fn accept_file(&mut self, file: SelectedFile) -> Option<UploadRequest> {
        self.dragging = false;
        self.reading = false;

        if !self.file_input {
            warn!("⚠️  Files are not accepted in URL mode, ignoring {}", file.name);
            return None;
        }
        if self.uploading {
            debug!("Ignoring {} while an upload is in flight", file.name);
            return None;
        }

        if let Err(err) = self.policy.check(&file.media_type, file.size) {
            warn!("⚠️  Rejected {}: {}", file.name, err);
            self.fail_locally(err);
            return None;
        }

        debug!("Accepted {} from {}", file.name, file.path.display());
        self.release();
        self.original_preview = Some(Handle::from_bytes(file.bytes.clone()));
        self.source_file = Some(file.clone());

        let request = self.begin(Payload::File(file));
        info!("📤 Session {}: uploading {}", request.token, request_name(&request));
        Some(request)
    }

    /// URL-reference flow: validate the typed URL and start the request.
    pub fn submit_url(&mut self, input: &str) -> Option<UploadRequest> {
        if self.uploading {
            debug!("Ignoring URL submit while an upload is in flight");
            return None;
        }

        let url = match parse_document_url(input) {
            Ok(url) => url,
            Err(err) => {
                warn!("⚠️  Rejected URL '{}': {}", input.trim(), err);
                self.fail_locally(err);
                return None;
            }
        };

        self.release();
        let request = self.begin(Payload::DocumentUrl(url));
        info!("📤 Session {}: submitting {}", request.token, request_name(&request));
        Some(request)
    }

    /// A file could not even be read; treated like a validation failure.
    pub fn reject(&mut self, error: UploadError) {
        self.dragging = false;
        self.reading = false;
        if self.uploading {
            debug!("Ignoring read failure while an upload is in flight: {}", error);
            return;
        }

        if error.is_validation() {
            warn!("⚠️  {}", error);
        } else {
            error!("❌ {}", error);
        }
        self.release();
        self.last_error = Some(error.user_message());
    }

    /// Apply the outcome of the request tagged with `token`.
    ///
    /// Returns `false` when the outcome was stale and discarded.
    pub fn finish_upload(
        &mut self,
        token: u64,
        outcome: Result<ProcessedResult, UploadError>,
    ) -> bool {
        if token != self.token || !self.uploading {
            debug!(
                "Discarding stale result for session {} (current {})",
                token, self.token
            );
            return false;
        }

        self.uploading = false;

        match outcome {
            Ok(result) => {
                let preview = match &result {
                    ProcessedResult::Image { bytes, .. } => Some(Handle::from_bytes(bytes.clone())),
                    ProcessedResult::Grade(_) => None,
                };
                info!("✅ Session {}: result received", token);
                self.result = Some(SessionResult { result, preview });
                self.last_error = None;
            }
            Err(err) => {
                warn!("❌ Session {}: {}", token, err);
                self.result = None;
                self.last_error = Some(err.user_message());
            }
        }

        true
    }

    /// Back to Idle. Any request still running will be discarded.
    pub fn reset(&mut self) {
        self.release();
        self.token += 1;
        self.uploading = false;
        self.dragging = false;
        debug!("Session reset (token {})", self.token);
    }

    fn begin(&mut self, payload: Payload) -> UploadRequest {
        self.token += 1;
        self.uploading = true;
        self.last_error = None;
        self.result = None;

        UploadRequest {
            token: self.token,
            payload,
        }
    }

    fn fail_locally(&mut self, err: ValidationError) {
        self.release();
        self.last_error = Some(UploadError::from(err).user_message());
    }

    /// Drop the file, both displayable handles and any error
    fn release(&mut self) {
        self.source_file = None;
        self.original_preview = None;
        self.result = None;
        self.last_error = None;
    }
}

fn request_name(request: &UploadRequest) -> &str {
    match &request.payload {
        Payload::File(file) => &file.name,
        Payload::DocumentUrl(url) => url.as_str(),
    }
}

/// Trimmed http(s) URL or a validation error
pub fn parse_document_url(input: &str) -> Result<url::Url, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::InvalidUrl);
    }

    match url::Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(url),
        _ => Err(ValidationError::InvalidUrl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::ResultSource;

    const MB: usize = 1024 * 1024;

    fn session() -> UploadSession {
        UploadSession::new(UploadPolicy::default())
    }

    fn jpeg(size: usize) -> SelectedFile {
        SelectedFile::from_bytes("scan.jpg", vec![0u8; size])
    }

    fn image_result() -> ProcessedResult {
        ProcessedResult::Image {
            bytes: vec![1, 2, 3],
            source: ResultSource::Embedded,
        }
    }

    #[test]
    fn test_starts_idle() {
        let session = session();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!session.is_uploading());
        assert!(session.original_preview().is_none());
        assert!(!snapshot.has_result);
        assert_eq!(snapshot.last_error, None);
    }

    #[test]
    fn test_non_image_is_rejected_without_request() {
        let mut session = session();
        for name in ["exam.pdf", "notes.txt", "archive.zip", "README"] {
            let request = session.accept_file(SelectedFile::from_bytes(name, vec![0u8; 64]));
            assert!(request.is_none(), "{name} must not be sent");
            assert_eq!(session.phase(), Phase::Failed);
            assert!(!session.is_uploading());
            assert!(session.last_error().unwrap().contains("image"));
        }
    }

    #[test]
    fn test_oversized_png_fails_without_request() {
        let mut session = session();
        let request = session.accept_file(SelectedFile::from_bytes("scan.png", vec![0u8; 11 * MB]));

        assert!(request.is_none());
        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.last_error().unwrap().contains("too large"));
        assert!(session.original_preview().is_none());
        assert!(!session.is_uploading());
    }

    #[test]
    fn test_jpeg_idle_uploading_success() {
        let mut session = session();
        assert_eq!(session.phase(), Phase::Idle);

        let request = session.accept_file(jpeg(2 * MB)).expect("should upload");
        assert_eq!(session.phase(), Phase::Uploading);
        assert!(session.original_preview().is_some());
        assert!(matches!(request.payload, Payload::File(ref f) if f.name == "scan.jpg"));

        assert!(session.finish_upload(request.token, Ok(image_result())));
        assert_eq!(session.phase(), Phase::Success);
        let result = session.result().expect("result");
        assert!(result.preview.is_some());
        assert_eq!(session.last_error(), None);
        assert!(!session.is_uploading());
    }

    #[test]
    fn test_http_error_shows_message_and_no_result() {
        let mut session = session();
        let request = session.accept_file(jpeg(1024)).unwrap();

        let applied = session.finish_upload(
            request.token,
            Err(UploadError::Rejected {
                status: 500,
                message: "Upload failed with status 500".to_string(),
            }),
        );

        assert!(applied);
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.last_error(), Some("Upload failed with status 500"));
        assert!(session.result().is_none());
        assert!(!session.is_uploading());
        // The original stays visible next to the error
        assert!(session.original_preview().is_some());
    }

    #[test]
    fn test_network_error_is_generic() {
        let mut session = session();
        let request = session.accept_file(jpeg(1024)).unwrap();
        session.finish_upload(request.token, Err(UploadError::Network("refused".to_string())));

        assert_eq!(
            session.last_error(),
            Some(crate::error::NETWORK_FAILURE_MESSAGE)
        );
        assert!(!session.is_uploading());
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let initial = session().snapshot();

        let mut session = session();
        let request = session.accept_file(jpeg(1024)).unwrap();
        session.finish_upload(request.token, Ok(image_result()));
        session.reset();
        assert_eq!(session.snapshot(), initial);

        session.accept_file(SelectedFile::from_bytes("bad.txt", vec![1]));
        session.reset();
        assert_eq!(session.snapshot(), initial);
    }

    #[test]
    fn test_reset_during_upload_discards_late_result() {
        let mut session = session();
        let request = session.accept_file(jpeg(1024)).unwrap();
        session.reset();

        assert!(!session.finish_upload(request.token, Ok(image_result())));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.result().is_none());
    }

    #[test]
    fn test_new_file_supersedes_previous_session() {
        let mut session = session();
        let first = session.accept_file(jpeg(1024)).unwrap();
        session.finish_upload(first.token, Ok(image_result()));

        let second = session
            .accept_file(SelectedFile::from_bytes("second.png", vec![9u8; 10]))
            .unwrap();
        assert!(second.token > first.token);
        assert_eq!(session.phase(), Phase::Uploading);
        assert!(session.result().is_none());
        assert_eq!(session.source_file().unwrap().name, "second.png");

        // The old token can no longer touch the session
        assert!(!session.finish_upload(first.token, Err(UploadError::Protocol("late".into()))));
        assert_eq!(session.phase(), Phase::Uploading);
    }

    #[test]
    fn test_files_ignored_while_uploading() {
        let mut session = session();
        let first = session.accept_file(jpeg(1024)).unwrap();

        assert!(session.accept_file(jpeg(2048)).is_none());
        assert!(session.submit_url("https://example.com/a.pdf").is_none());
        assert_eq!(session.phase(), Phase::Uploading);
        assert!(session.finish_upload(first.token, Ok(image_result())));
    }

    #[test]
    fn test_failed_then_new_file_clears_error() {
        let mut session = session();
        session.accept_file(SelectedFile::from_bytes("bad.gifv", vec![1]));
        assert_eq!(session.phase(), Phase::Failed);

        assert!(session.accept_file(jpeg(10)).is_some());
        assert_eq!(session.last_error(), None);
        assert_eq!(session.phase(), Phase::Uploading);
    }

    #[test]
    fn test_submit_url_flow() {
        let mut session = session();

        assert!(session.submit_url("   ").is_none());
        assert_eq!(session.last_error(), Some("Please enter a valid PDF URL"));
        assert!(session.submit_url("not a url").is_none());
        assert!(session.submit_url("file:///etc/passwd").is_none());

        let request = session
            .submit_url(" https://blob.example.com/exams/42.pdf ")
            .expect("valid url");
        assert_eq!(session.phase(), Phase::Uploading);
        assert_eq!(session.last_error(), None);
        match &request.payload {
            Payload::DocumentUrl(url) => assert_eq!(url.path(), "/exams/42.pdf"),
            other => panic!("unexpected payload {other:?}"),
        }

        session.finish_upload(request.token, Ok(ProcessedResult::Grade("17.5".into())));
        let result = session.result().unwrap();
        assert_eq!(result.result, ProcessedResult::Grade("17.5".into()));
        assert!(result.preview.is_none());
    }

    #[test]
    fn test_read_failure_is_reported() {
        let mut session = session();
        session.reject(UploadError::Io {
            path: "/tmp/x.png".into(),
            reason: "permission denied".into(),
        });
        assert_eq!(session.phase(), Phase::Failed);
        assert!(session.last_error().unwrap().contains("permission denied"));
    }

    #[test]
    fn test_drop_clears_drag_highlight() {
        let mut session = session();
        session.set_dragging(true);
        assert!(session.snapshot().dragging);

        session.accept_file(jpeg(10));
        assert!(!session.is_dragging());
    }

    #[test]
    fn test_url_mode_ignores_files() {
        let mut session = session().with_file_input(false);
        assert!(!session.accepts_files());

        session.set_dragging(true);
        assert!(!session.is_dragging());
        assert!(!session.begin_read(Path::new("/tmp/scan.jpg")));
        assert!(session.accept_file(jpeg(1024)).is_none());

        assert_eq!(session.snapshot(), UploadSession::new(UploadPolicy::default()).snapshot());
        // The URL form still works
        assert!(session.submit_url("https://blob.example.com/exam.pdf").is_some());
    }

    #[test]
    fn test_only_first_of_several_drops_is_read() {
        let mut session = session();
        assert!(session.begin_read(Path::new("/tmp/first.png")));
        assert!(!session.begin_read(Path::new("/tmp/second.png")));

        let request = session
            .accept_file(SelectedFile::from_bytes("first.png", vec![1u8; 16]))
            .expect("first file uploads");
        assert_eq!(session.source_file().unwrap().name, "first.png");

        // Read slot is free again, but the upload blocks new files
        assert!(!session.begin_read(Path::new("/tmp/third.png")));
        session.finish_upload(request.token, Ok(image_result()));
        assert!(session.begin_read(Path::new("/tmp/third.png")));
    }

    #[test]
    fn test_read_failure_frees_read_slot() {
        let mut session = session();
        assert!(session.begin_read(Path::new("/tmp/gone.png")));
        session.reject(UploadError::Io {
            path: "/tmp/gone.png".into(),
            reason: "not found".into(),
        });
        assert!(session.begin_read(Path::new("/tmp/other.png")));
    }

    #[test]
    fn test_no_drag_highlight_while_uploading() {
        let mut session = session();
        session.accept_file(jpeg(10)).unwrap();
        session.set_dragging(true);
        assert!(!session.is_dragging());
    }
}
