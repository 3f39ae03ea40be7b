use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";
pub const WEBP_MIME: &str = "image/webp";

pub const SUPPORTED_IMAGE_MIMES: [&str; 3] = [PNG_MIME, JPEG_MIME, WEBP_MIME];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageAttachment {
    /// Resolves the MIME type from the hint, sniffing the bytes when the hint
    /// is missing or generic.
    pub fn from_bytes(bytes: Vec<u8>, mime_hint: Option<&str>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow!("image data is empty"));
        }
        let mime = resolve_image_mime(mime_hint.unwrap_or("auto"), &bytes)?;
        Ok(Self { bytes, mime })
    }

    pub fn preview_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}

fn resolve_image_mime(hint: &str, bytes: &[u8]) -> Result<String> {
    let lower = hint.trim().to_lowercase();
    let resolved = match lower.as_str() {
        "" | "auto" | "image" | "image/*" | "application/octet-stream" => {
            return sniff_image_mime(bytes)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("unable to detect image type"));
        }
        "png" => PNG_MIME,
        "jpg" | "jpeg" | "image/jpg" => JPEG_MIME,
        "webp" => WEBP_MIME,
        other => other,
    };
    if SUPPORTED_IMAGE_MIMES.iter().any(|mime| *mime == resolved) {
        return Ok(resolved.to_string());
    }
    Err(anyhow!(
        "unsupported image type '{}' (expected image/png, image/jpeg or image/webp)",
        hint.trim()
    ))
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    SUPPORTED_IMAGE_MIMES
        .into_iter()
        .find(|mime| *mime == kind.mime_type())
}

pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "png" => Some(PNG_MIME),
        "jpg" | "jpeg" => Some(JPEG_MIME),
        "webp" => Some(WEBP_MIME),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) const PNG_SIGNATURE: [u8; 16] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_supported_mime_is_kept() {
        let image = ImageAttachment::from_bytes(vec![1, 2, 3], Some("image/webp")).unwrap();
        assert_eq!(image.mime, WEBP_MIME);
        let image = ImageAttachment::from_bytes(vec![1, 2, 3], Some("JPG")).unwrap();
        assert_eq!(image.mime, JPEG_MIME);
    }

    #[test]
    fn generic_hint_sniffs_bytes() {
        let image = ImageAttachment::from_bytes(PNG_SIGNATURE.to_vec(), Some("auto")).unwrap();
        assert_eq!(image.mime, PNG_MIME);
    }

    #[test]
    fn unsupported_types_are_rejected() {
        let err = ImageAttachment::from_bytes(vec![1, 2, 3], Some("image/gif")).unwrap_err();
        assert!(err.to_string().contains("unsupported image type"));
        assert!(ImageAttachment::from_bytes(Vec::new(), Some(PNG_MIME)).is_err());
        assert!(ImageAttachment::from_bytes(b"plain text".to_vec(), None).is_err());
    }

    #[test]
    fn preview_is_a_data_url() {
        let image = ImageAttachment::from_bytes(b"abc".to_vec(), Some(PNG_MIME)).unwrap();
        insta::assert_snapshot!(image.preview_url(), @"data:image/png;base64,YWJj");
    }
}
