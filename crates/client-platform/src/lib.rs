//! Attachment input origins for the Ember client.
//!
//! Every origin yields the same `AttachmentPayload`; validation and encoding
//! happen downstream in `client_core::attachment`, so a file picked from
//! disk and an image pasted from the clipboard travel one code path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Raw bytes plus the origin's best guess at a MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum AttachmentSourceError {
    /// The origin had nothing to offer: missing file, imageless clipboard.
    #[error("no image available from this source")]
    NoImage,
    /// The origin exists but could not be read right now.
    #[error("attachment source unavailable: {0}")]
    Unavailable(String),
    /// The platform backend itself failed.
    #[error("attachment backend error: {0}")]
    Backend(String),
}

/// An origin the frontend can pull a draft attachment from.
pub trait AttachmentSource: Send + Sync {
    fn read(&self) -> Result<AttachmentPayload, AttachmentSourceError>;
}

/// Reads an image file from disk, guessing the MIME type from the extension.
#[derive(Debug, Clone)]
pub struct FileAttachmentSource {
    path: PathBuf,
}

impl FileAttachmentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AttachmentSource for FileAttachmentSource {
    fn read(&self) -> Result<AttachmentPayload, AttachmentSourceError> {
        let bytes = fs::read(&self.path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AttachmentSourceError::NoImage,
            _ => AttachmentSourceError::Unavailable(err.to_string()),
        })?;
        Ok(AttachmentPayload {
            content_type: content_type_from_extension(&self.path).map(str::to_owned),
            bytes,
        })
    }
}

fn content_type_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Pulls the current clipboard image and re-encodes it as PNG bytes, so the
/// downstream encoder sees the same shape a file read produces.
#[cfg(feature = "clipboard")]
#[derive(Debug, Default)]
pub struct ClipboardAttachmentSource;

#[cfg(feature = "clipboard")]
impl AttachmentSource for ClipboardAttachmentSource {
    fn read(&self) -> Result<AttachmentPayload, AttachmentSourceError> {
        use std::io::Cursor;

        let mut clipboard = arboard::Clipboard::new()
            .map_err(|err| AttachmentSourceError::Backend(err.to_string()))?;
        let grabbed = match clipboard.get_image() {
            Ok(image) => image,
            Err(arboard::Error::ContentNotAvailable) => {
                return Err(AttachmentSourceError::NoImage);
            }
            Err(err) => return Err(AttachmentSourceError::Backend(err.to_string())),
        };

        let rgba = image::RgbaImage::from_raw(
            grabbed.width as u32,
            grabbed.height as u32,
            grabbed.bytes.into_owned(),
        )
        .ok_or_else(|| {
            AttachmentSourceError::Backend("clipboard returned a malformed image".into())
        })?;

        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|err| AttachmentSourceError::Backend(err.to_string()))?;

        Ok(AttachmentPayload {
            bytes,
            content_type: Some("image/png".to_owned()),
        })
    }
}

/// Fixed payload, for wiring tests and headless tools.
#[derive(Debug, Clone)]
pub struct InMemoryAttachmentSource {
    payload: AttachmentPayload,
}

impl InMemoryAttachmentSource {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            payload: AttachmentPayload {
                bytes,
                content_type,
            },
        }
    }
}

impl AttachmentSource for InMemoryAttachmentSource {
    fn read(&self) -> Result<AttachmentPayload, AttachmentSourceError> {
        Ok(self.payload.clone())
    }
}
