/// Image payloads stored inside reseñas
///
/// Photos are kept as self-contained `data:` URLs so a record carries
/// its images with it, both in the store and in JSON import files.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("could not read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a supported image")]
    UnsupportedFormat,

    #[error("payload is not a base64 data URL")]
    NotDataUrl,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Encode image file contents as `data:<mime>;base64,<...>`
pub fn encode_image(bytes: &[u8]) -> Result<String, PayloadError> {
    let format = image::guess_format(bytes).map_err(|_| PayloadError::UnsupportedFormat)?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

/// Raw image bytes behind a payload
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, PayloadError> {
    let (header, data) = payload
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(PayloadError::NotDataUrl)?;

    if !header.ends_with(";base64") {
        return Err(PayloadError::NotDataUrl);
    }

    Ok(STANDARD.decode(data.trim())?)
}

/// Read a picked file and turn it into a payload
pub async fn encode_file(path: PathBuf) -> Result<String, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("{}: {e}", path.display()))?;

    let payload = encode_image(&bytes).map_err(|e| format!("{}: {e}", path.display()))?;
    info!("🖼️  Encoded {} ({} KB)", path.display(), bytes.len() / 1024);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn encodes_png_as_data_url() {
        let png = tiny_png();
        let payload = encode_image(&png).unwrap();
        assert!(payload.starts_with("data:image/png;base64,"));
        assert_eq!(decode_payload(&payload).unwrap(), png);
    }

    #[test]
    fn rejects_non_images() {
        assert!(matches!(
            encode_image(b"just some text"),
            Err(PayloadError::UnsupportedFormat)
        ));
    }

    #[test]
    fn rejects_foreign_payloads() {
        assert!(matches!(decode_payload(""), Err(PayloadError::NotDataUrl)));
        assert!(matches!(
            decode_payload("data:image/png,rawdata"),
            Err(PayloadError::NotDataUrl)
        ));
        assert!(matches!(
            decode_payload("data:image/png;base64,***"),
            Err(PayloadError::Base64(_))
        ));
    }

    #[test]
    fn encodes_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let payload = rt.block_on(encode_file(path)).unwrap();
        assert!(payload.starts_with("data:image/png;base64,"));
    }
}
