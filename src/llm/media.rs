use base64::{engine::general_purpose, Engine as _};

use crate::error::ApiError;

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// Splits `data:image/png;base64,AAAA` into its header and payload. Strings
/// without a comma are treated as a bare payload.
fn split_data_url(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(',') {
        Some((header, payload)) => (Some(header), payload),
        None => (None, raw),
    }
}

fn mime_for(header: Option<&str>, bytes: &[u8]) -> &'static str {
    match header {
        Some(header) if header.trim_start().starts_with("data:image/png") => MIME_PNG,
        Some(_) => MIME_JPEG,
        None if detect_mime_type(bytes).as_deref() == Some(MIME_PNG) => MIME_PNG,
        None => MIME_JPEG,
    }
}

/// Decodes one transport-encoded screenshot. Anything that is not marked or
/// sniffed as PNG is sent as JPEG.
pub fn decode_image_payload(raw: &str) -> Result<InlineImage, base64::DecodeError> {
    let (header, payload) = split_data_url(raw.trim());
    let bytes = general_purpose::STANDARD.decode(payload.trim())?;
    Ok(InlineImage {
        mime_type: mime_for(header, &bytes),
        bytes,
    })
}

pub fn decode_image_payloads(raw_images: &[String]) -> Result<Vec<InlineImage>, ApiError> {
    raw_images
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            decode_image_payload(raw).map_err(|err| {
                ApiError::InvalidArgument(format!(
                    "画像{}のデコードに失敗しました: {}",
                    index + 1,
                    err
                ))
            })
        })
        .collect()
}

pub fn encode_image(image: &InlineImage) -> String {
    general_purpose::STANDARD.encode(&image.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F', 0];

    fn b64(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn png_data_url_is_tagged_png() {
        let raw = format!("data:image/png;base64,{}", b64(b"not really a png"));
        let image = decode_image_payload(&raw).unwrap();
        assert_eq!(image.mime_type, MIME_PNG);
        assert_eq!(image.bytes, b"not really a png");
    }

    #[test]
    fn other_data_urls_default_to_jpeg() {
        let raw = format!("data:image/webp;base64,{}", b64(PNG_HEADER));
        assert_eq!(decode_image_payload(&raw).unwrap().mime_type, MIME_JPEG);
    }

    #[test]
    fn bare_payload_is_sniffed() {
        assert_eq!(
            decode_image_payload(&b64(PNG_HEADER)).unwrap().mime_type,
            MIME_PNG
        );
        assert_eq!(
            decode_image_payload(&b64(JPEG_HEADER)).unwrap().mime_type,
            MIME_JPEG
        );
    }

    #[test]
    fn reports_which_image_failed() {
        let images = vec![b64(JPEG_HEADER), "data:image/jpeg;base64,@@@".to_string()];
        let err = decode_image_payloads(&images).unwrap_err();
        match err {
            ApiError::InvalidArgument(message) => assert!(message.starts_with("画像2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn keeps_order_and_round_trips_bytes() {
        let images = vec![b64(JPEG_HEADER), format!("data:image/png;base64,{}", b64(PNG_HEADER))];
        let decoded = decode_image_payloads(&images).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].bytes, JPEG_HEADER);
        assert_eq!(encode_image(&decoded[1]), b64(PNG_HEADER));
    }
}
