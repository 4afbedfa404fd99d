// Capture controller - local acquisition of the candidate image
//
// Everything here is local state derived from user input; no network access.
// Exactly one image may be active at a time: selecting a new one releases
// the previous preview handle, discarding is idempotent.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Identity tag for a captured image.
///
/// In-flight analysis requests carry the id of the image they were built
/// from, so a completion arriving for a replaced or discarded image can be
/// recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

impl ImageId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img-{}", self.0)
    }
}

/// A candidate file as picked by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    /// Read a candidate file from disk. The file name (not the full path)
    /// becomes the display name of the eventual preview handle.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Locally displayable reference to the active image.
///
/// Dropped together with the last reference to its `CapturedImage`, which
/// is the release point for the preview resource.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    pub display_name: String,
}

/// The image chosen for analysis: binary payload, preview handle and a
/// content-type tag sniffed from the payload's magic bytes.
#[derive(Debug)]
pub struct CapturedImage {
    pub id: ImageId,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub preview: PreviewHandle,
}

/// Capture-time validation failures. Recovered locally; nothing is ever
/// submitted for an invalid candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("selected file is empty")]
    EmptyFile,
    #[error("selected file is not a recognized image format")]
    NotAnImage,
}

/// Owns the single active `CapturedImage`.
#[derive(Debug, Default)]
pub struct CaptureController {
    active: Option<Arc<CapturedImage>>,
}

impl CaptureController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a candidate and make it the active image.
    ///
    /// On success the previous image (if any) is released. On failure the
    /// prior state is left untouched.
    pub fn select(&mut self, raw: RawFile) -> Result<Arc<CapturedImage>, CaptureError> {
        if raw.bytes.is_empty() {
            return Err(CaptureError::EmptyFile);
        }

        let format = image::guess_format(&raw.bytes).map_err(|_| CaptureError::NotAnImage)?;
        let content_type = format.to_mime_type();

        let captured = Arc::new(CapturedImage {
            id: ImageId::next(),
            bytes: raw.bytes,
            content_type,
            preview: PreviewHandle {
                display_name: raw.name,
            },
        });

        if let Some(previous) = self.active.replace(captured.clone()) {
            tracing::debug!(id = %previous.id, "released previous preview");
        }
        tracing::info!(id = %captured.id, name = %captured.preview.display_name,
            content_type = %captured.content_type, "image selected");

        Ok(captured)
    }

    /// Release the active image. Safe to call when nothing is active.
    pub fn discard(&mut self) {
        if let Some(previous) = self.active.take() {
            tracing::debug!(id = %previous.id, "discarded active image");
        }
    }

    pub fn active(&self) -> Option<&Arc<CapturedImage>> {
        self.active.as_ref()
    }
}
