//! Draft-attachment validation and inline data-URI encoding.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Hard ceiling on raw attachment bytes, checked before any encoding work.
pub const MAX_ATTACHMENT_BYTES: usize = 6 * 1024 * 1024;

/// A validated, wire-ready inline attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    /// `data:<mime>;base64,<payload>`.
    pub data_uri: String,
    pub mime: String,
    /// Raw length before base64 inflation.
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttachmentError {
    #[error("attachment is {size} bytes; the limit is {MAX_ATTACHMENT_BYTES}")]
    Oversize { size: usize },
    #[error("unsupported image format; expected png, jpeg, gif, or webp bytes")]
    UnsupportedFormat,
    #[error("attachment is empty")]
    Empty,
}

/// Validates raw image bytes and encodes them as an inline `data:` URI.
///
/// The ceiling applies to the raw bytes; oversize input is rejected before
/// any base64 work happens. The MIME type is taken from
/// `declared_content_type` when it names an image, otherwise sniffed from
/// the leading bytes.
pub fn encode_image(
    bytes: &[u8],
    declared_content_type: Option<&str>,
) -> Result<EncodedImage, AttachmentError> {
    if bytes.is_empty() {
        return Err(AttachmentError::Empty);
    }
    if bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::Oversize { size: bytes.len() });
    }
    let mime = match declared_content_type {
        Some(declared) if declared.starts_with("image/") => declared.to_owned(),
        _ => mime_from_bytes(bytes)
            .ok_or(AttachmentError::UnsupportedFormat)?
            .to_owned(),
    };
    let payload = STANDARD.encode(bytes);
    Ok(EncodedImage {
        data_uri: format!("data:{mime};base64,{payload}"),
        mime,
        byte_len: bytes.len(),
    })
}

/// MIME type from magic bytes, for origins that do not declare one.
pub fn mime_from_bytes(bytes: &[u8]) -> Option<&'static str> {
    const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    if bytes.len() >= 8 && bytes[..8] == PNG {
        return Some("image/png");
    }
    if bytes.len() >= 3 && bytes[..3] == [0xFF, 0xD8, 0xFF] {
        return Some("image/jpeg");
    }
    if bytes.len() >= 6 && (&bytes[..6] == b"GIF87a" || &bytes[..6] == b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn rejects_oversize_input_before_encoding() {
        let bytes = vec![0u8; MAX_ATTACHMENT_BYTES + 1];
        assert_eq!(
            encode_image(&bytes, Some("image/png")),
            Err(AttachmentError::Oversize {
                size: MAX_ATTACHMENT_BYTES + 1
            })
        );
    }

    #[test]
    fn accepts_input_exactly_at_the_ceiling() {
        let mut bytes = vec![0u8; MAX_ATTACHMENT_BYTES];
        bytes[..8].copy_from_slice(&PNG_HEADER);
        assert!(encode_image(&bytes, None).is_ok());
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(encode_image(&[], None), Err(AttachmentError::Empty));
    }

    #[test]
    fn declared_image_mime_wins_over_sniffing() {
        let encoded = encode_image(b"GIF89a-rest", Some("image/png")).expect("valid");
        assert_eq!(encoded.mime, "image/png");
        assert!(encoded.data_uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn non_image_declaration_falls_back_to_sniffing() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(b"body");
        let encoded = encode_image(&bytes, Some("application/octet-stream")).expect("valid");
        assert_eq!(encoded.mime, "image/png");
    }

    #[test]
    fn sniffs_the_supported_formats() {
        assert_eq!(mime_from_bytes(&PNG_HEADER), Some("image/png"));
        assert_eq!(mime_from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(mime_from_bytes(b"GIF87a"), Some("image/gif"));
        assert_eq!(mime_from_bytes(b"GIF89a"), Some("image/gif"));
        assert_eq!(mime_from_bytes(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
        assert_eq!(mime_from_bytes(b"plain text"), None);
        assert_eq!(mime_from_bytes(b"RIFF\x00\x00\x00\x00WAVE"), None);
    }

    #[test]
    fn encodes_a_data_uri_that_round_trips() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        let encoded = encode_image(&bytes, None).expect("valid");
        assert_eq!(encoded.byte_len, bytes.len());
        let payload = encoded
            .data_uri
            .strip_prefix("data:image/png;base64,")
            .expect("prefix");
        assert_eq!(STANDARD.decode(payload).expect("decodable"), bytes);
    }
}
