//! Core data types for queued images

use crate::services::ImageIOService;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identifier of a queued image, stable for the record's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(Uuid);

impl ImageId {
    /// Generate a fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a queued image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Accepted into the queue, waiting for a batch run
    Uploaded,
    /// Request to the removal service is in flight
    Processing,
    /// Result received
    Processed,
    /// Last request failed
    Errored,
}

impl ImageStatus {
    /// Whether a user-initiated re-process is allowed from this status
    #[must_use]
    pub fn can_reprocess(self) -> bool {
        matches!(self, Self::Processed | Self::Errored)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uploaded => write!(f, "uploaded"),
            Self::Processing => write!(f, "processing"),
            Self::Processed => write!(f, "processed"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

/// An image file offered for intake
///
/// Bytes are shared immutably so cloning a file (and every state snapshot that
/// contains it) never copies image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    mime: Option<String>,
    bytes: Arc<Vec<u8>>,
}

impl SourceFile {
    /// Create a source file from in-memory content
    ///
    /// `mime` is the type declared by whatever delivered the file (browser,
    /// upload form). Pass `None` to rely on content sniffing.
    pub fn new<S: Into<String>>(name: S, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            bytes: Arc::new(bytes),
        }
    }

    /// Read a source file from disk
    ///
    /// # Errors
    /// - File cannot be read
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        ImageIOService::load_source(path)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn declared_mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn shared_bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Resolve the image MIME type, or `None` if this is not an image
    #[must_use]
    pub fn image_mime(&self) -> Option<String> {
        ImageIOService::detect_image_mime(&self.name, self.mime.as_deref(), &self.bytes)
    }

    /// Whether this file is accepted by intake
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.image_mime().is_some()
    }
}

/// A renderable reference to image content (original or processed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRef {
    bytes: Arc<Vec<u8>>,
    mime: String,
}

impl PreviewRef {
    pub fn new<S: Into<String>>(bytes: Vec<u8>, mime: S) -> Self {
        Self {
            bytes: Arc::new(bytes),
            mime: mime.into(),
        }
    }

    /// Wrap a service response, sniffing its MIME type from content
    #[must_use]
    pub fn from_response(bytes: Vec<u8>) -> Self {
        let mime = ImageIOService::sniff_mime(&bytes).unwrap_or("application/octet-stream");
        Self::new(bytes, mime)
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub(crate) fn shared_bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Probe pixel dimensions without a full decode
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        ImageIOService::probe_dimensions(&self.bytes)
    }
}

/// One queued image and its processing state
///
/// Fields are private so the `result` / `status` pairing can only change
/// through the reducer in [`crate::state`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    id: ImageId,
    source: SourceFile,
    status: ImageStatus,
    result: Option<PreviewRef>,
    last_error: Option<String>,
    added_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Create a freshly uploaded record
    #[must_use]
    pub fn new(source: SourceFile) -> Self {
        Self {
            id: ImageId::new(),
            source,
            status: ImageStatus::Uploaded,
            result: None,
            last_error: None,
            added_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ImageId {
        self.id
    }

    #[must_use]
    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        self.source.name()
    }

    #[must_use]
    pub fn status(&self) -> ImageStatus {
        self.status
    }

    /// Processed output; present if and only if the status is `Processed`
    #[must_use]
    pub fn result(&self) -> Option<&PreviewRef> {
        self.result.as_ref()
    }

    /// Reason of the last failure while `Errored`
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// Renderable reference to the original upload
    #[must_use]
    pub fn source_preview(&self) -> PreviewRef {
        let mime = self
            .source
            .image_mime()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        PreviewRef {
            bytes: self.source.shared_bytes(),
            mime,
        }
    }

    pub(crate) fn mark_processing(&mut self) {
        self.status = ImageStatus::Processing;
        self.result = None;
        self.last_error = None;
    }

    pub(crate) fn mark_processed(&mut self, result: PreviewRef) {
        self.status = ImageStatus::Processed;
        self.result = Some(result);
        self.last_error = None;
    }

    pub(crate) fn mark_errored(&mut self, reason: String) {
        self.status = ImageStatus::Errored;
        self.result = None;
        self.last_error = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_image_id_uniqueness() {
        let a = ImageId::new();
        let b = ImageId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }

    #[test]
    fn test_status_display_and_reprocess() {
        assert_eq!(ImageStatus::Uploaded.to_string(), "uploaded");
        assert_eq!(ImageStatus::Errored.to_string(), "errored");
        assert!(ImageStatus::Processed.can_reprocess());
        assert!(ImageStatus::Errored.can_reprocess());
        assert!(!ImageStatus::Uploaded.can_reprocess());
        assert!(!ImageStatus::Processing.can_reprocess());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&ImageStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let status: ImageStatus = serde_json::from_str("\"errored\"").unwrap();
        assert_eq!(status, ImageStatus::Errored);
    }

    #[test]
    fn test_source_file_sharing() {
        let file = SourceFile::new("cat.png", Some("image/png"), PNG_HEADER.to_vec());
        let copy = file.clone();
        assert!(Arc::ptr_eq(&file.shared_bytes(), &copy.shared_bytes()));
        assert_eq!(file.len(), 8);
        assert!(file.is_image());
    }

    #[test]
    fn test_record_lifecycle_keeps_result_invariant() {
        let mut record = ImageRecord::new(SourceFile::new(
            "cat.png",
            Some("image/png"),
            PNG_HEADER.to_vec(),
        ));
        assert_eq!(record.status(), ImageStatus::Uploaded);
        assert!(record.result().is_none());

        record.mark_processing();
        assert!(record.result().is_none());

        record.mark_processed(PreviewRef::new(vec![1, 2, 3], "image/png"));
        assert_eq!(record.status(), ImageStatus::Processed);
        assert_eq!(record.result().unwrap().len(), 3);

        record.mark_processing();
        assert!(record.result().is_none());

        record.mark_errored("Server error 500".to_string());
        assert_eq!(record.status(), ImageStatus::Errored);
        assert!(record.result().is_none());
        assert_eq!(record.last_error(), Some("Server error 500"));
    }

    #[test]
    fn test_source_preview_reuses_bytes() {
        let record = ImageRecord::new(SourceFile::new("cat.png", None, PNG_HEADER.to_vec()));
        let preview = record.source_preview();
        assert_eq!(preview.mime(), "image/png");
        assert_eq!(preview.bytes(), PNG_HEADER);
    }

    #[test]
    fn test_preview_from_response_sniffs_mime() {
        let preview = PreviewRef::from_response(PNG_HEADER.to_vec());
        assert_eq!(preview.mime(), "image/png");

        let opaque = PreviewRef::from_response(vec![0, 1, 2, 3, 4]);
        assert_eq!(opaque.mime(), "application/octet-stream");
    }
}
