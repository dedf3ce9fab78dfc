//! Attachment normalization
//!
//! Only base64 data-URL images are sent to the model. Everything else stays
//! in the conversation for display but is filtered out of outbound requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::Attachment;

const BASE64_MARKER: &str = "base64,";

/// Inline binary payload accepted by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Failed to read attachment {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Check if a MIME type names an image
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Keep the attachments usable as model input, in order.
pub fn validate_for_transport(candidates: &[Attachment]) -> Vec<InlineImage> {
    candidates
        .iter()
        .filter(|attachment| is_image_mime(&attachment.mime_type))
        .filter_map(|attachment| {
            let (_, data) = attachment.url.split_once(BASE64_MARKER)?;
            if data.is_empty() {
                return None;
            }
            Some(InlineImage {
                mime_type: attachment.mime_type.clone(),
                data: data.to_string(),
            })
        })
        .collect()
}

/// Rebuild the data URL an inline image was extracted from.
pub fn to_data_url(image: &InlineImage) -> String {
    format!("data:{};{}{}", image.mime_type, BASE64_MARKER, image.data)
}

/// Build an attachment carrying `bytes` as an owned data URL.
pub fn attachment_from_bytes(name: &str, mime_type: &str, bytes: &[u8]) -> Attachment {
    Attachment {
        mime_type: mime_type.to_string(),
        url: format!("data:{};{}{}", mime_type, BASE64_MARKER, STANDARD.encode(bytes)),
        name: name.to_string(),
    }
}

/// Read a local file into an attachment, guessing its MIME type from the
/// extension.
pub fn attachment_from_path(path: &Path) -> Result<Attachment, AttachmentError> {
    let bytes = std::fs::read(path).map_err(|source| AttachmentError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(attachment_from_bytes(&name, &mime_type, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(mime_type: &str, url: &str) -> Attachment {
        Attachment {
            mime_type: mime_type.into(),
            url: url.into(),
            name: "file".into(),
        }
    }

    #[test]
    fn keeps_only_base64_images() {
        let result = validate_for_transport(&[
            attachment("image/png", "data:image/png;base64,AAAA"),
            attachment("application/pdf", "data:application/pdf;base64,BBBB"),
        ]);
        assert_eq!(
            result,
            vec![InlineImage {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            }]
        );
    }

    #[test]
    fn rejects_url_without_marker() {
        let result = validate_for_transport(&[attachment("image/png", "https://no-base64-marker")]);
        assert!(result.is_empty());
    }

    #[test]
    fn drops_empty_payload() {
        let result = validate_for_transport(&[attachment("image/gif", "data:image/gif;base64,")]);
        assert!(result.is_empty());
    }

    #[test]
    fn preserves_order() {
        let result = validate_for_transport(&[
            attachment("image/jpeg", "data:image/jpeg;base64,ONE"),
            attachment("text/plain", "data:text/plain;base64,SKIP"),
            attachment("image/webp", "data:image/webp;base64,TWO"),
        ]);
        let data: Vec<_> = result.iter().map(|i| i.data.as_str()).collect();
        assert_eq!(data, ["ONE", "TWO"]);
    }

    #[test]
    fn bytes_become_transportable_data_url() {
        let attachment = attachment_from_bytes("dot.png", "image/png", &[1, 2, 3]);
        assert_eq!(attachment.url, "data:image/png;base64,AQID");
        let images = validate_for_transport(&[attachment]);
        assert_eq!(images.len(), 1);
        assert_eq!(to_data_url(&images[0]), "data:image/png;base64,AQID");
    }

    #[test]
    fn path_guesses_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpg").unwrap();
        let attachment = attachment_from_path(&path).unwrap();
        assert_eq!(attachment.mime_type, "image/jpeg");
        assert_eq!(attachment.name, "photo.jpg");
    }
}
