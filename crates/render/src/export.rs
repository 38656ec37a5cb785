//! PNG export.
//!
//! Encoding runs on tokio's blocking pool. The raster is snapshotted when
//! the export is requested, so later edits never leak into the artifact.

use crate::buffer::PixelBuffer;
use common::error::{StudioError, StudioResult};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::future::Future;
use tracing::debug;

/// Encode a raster as PNG at its native resolution.
pub fn encode_png(buffer: &PixelBuffer) -> StudioResult<Vec<u8>> {
    let expected = buffer.width as usize * buffer.height as usize * 4;
    if buffer.width == 0 || buffer.height == 0 || buffer.data.len() != expected {
        return Err(StudioError::encode(format!(
            "cannot encode a {}x{} raster holding {} bytes",
            buffer.width,
            buffer.height,
            buffer.data.len()
        )));
    }

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            &buffer.data,
            buffer.width,
            buffer.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| StudioError::encode(e.to_string()))?;

    debug!(
        width = buffer.width,
        height = buffer.height,
        bytes = bytes.len(),
        "encoded png"
    );
    Ok(bytes)
}

/// Encode a snapshot of `buffer` without blocking the caller.
///
/// Must be awaited inside a tokio runtime.
pub fn export_png(buffer: &PixelBuffer) -> impl Future<Output = StudioResult<Vec<u8>>> + Send + 'static {
    let snapshot = buffer.clone();
    async move {
        tokio::task::spawn_blocking(move || encode_png(&snapshot))
            .await
            .map_err(|e| StudioError::encode(format!("encode task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::color::Color;

    fn checker() -> PixelBuffer {
        let mut buffer = PixelBuffer::new(3, 2);
        buffer.fill(Color::WHITE);
        buffer.set_pixel(0, 0, Color::RED);
        buffer.set_pixel(2, 1, Color::rgba(0, 0, 255, 128));
        buffer
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let bytes = encode_png(&checker()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(2, 1).0, [0, 0, 255, 128]);
        assert_eq!(decoded.into_raw(), checker().data);
    }

    #[test]
    fn test_encode_rejects_bad_buffers() {
        assert!(matches!(encode_png(&PixelBuffer::new(0, 0)), Err(StudioError::Encode(_))));

        let mut truncated = checker();
        truncated.data.pop();
        assert!(matches!(encode_png(&truncated), Err(StudioError::Encode(_))));
    }

    #[tokio::test]
    async fn test_export_snapshots_at_call_time() {
        let mut buffer = checker();
        let pending = export_png(&buffer);
        buffer.fill(Color::BLACK);

        let bytes = pending.await.unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }
}
