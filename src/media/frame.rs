// src/media/frame.rs

/// One decoded RGBA frame from the live preview.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, 4 bytes per pixel.
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self { width, height, rgba }
    }

    /// A frame where every pixel has the same colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self { width, height, rgba }
    }

    pub fn pixel_count(&self) -> usize {
        self.rgba.len() / 4
    }

    /// Mean of `(r + g + b) / 3` over all pixels, in `0.0..=255.0`.
    /// An empty frame reads as fully dark.
    pub fn average_luma(&self) -> f32 {
        let pixels = self.pixel_count();
        if pixels == 0 {
            return 0.0;
        }

        let total: f64 = self
            .rgba
            .chunks_exact(4)
            .map(|px| (px[0] as f64 + px[1] as f64 + px[2] as f64) / 3.0)
            .sum();

        (total / pixels as f64) as f32
    }
}
