//! QR code rendering for verification links.

use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

/// Errors rendering a QR code.
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    /// The data does not fit in any QR version at the chosen level.
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders text into a PNG image of a QR code.
pub trait QrRenderer: Send + Sync {
    /// Encode `data` and return the PNG bytes.
    fn render_png(&self, data: &str) -> Result<Vec<u8>, QrError>;
}

/// Black-on-white PNG renderer backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy)]
pub struct PngQrRenderer {
    min_size: u32,
}

impl PngQrRenderer {
    /// Renderer producing images at least `min_size` pixels square.
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl Default for PngQrRenderer {
    fn default() -> Self {
        Self::new(256)
    }
}

impl QrRenderer for PngQrRenderer {
    fn render_png(&self, data: &str) -> Result<Vec<u8>, QrError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
        let img = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_size, self.min_size)
            .build();
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        Ok(out)
    }
}
