//! Rendered frame buffers.

use std::fmt;

/// A fully decoded RGBA8 pixel buffer tagged with its orbit ordinal.
///
/// Owned by exactly one pipeline attempt and dropped after encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Ordinal in the orbit sequence
    pub index: u32,
    pub width: u32,
    pub height: u32,
    /// Row-major, straight-alpha RGBA8, `width * height * 4` bytes
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a frame filled with a single colour.
    pub fn filled(index: u32, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            index,
            width,
            height,
            data,
        }
    }

    /// Expected buffer length for the frame's dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Whether the buffer length matches the dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_len()
    }

    /// Read one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

// Pixel data is omitted; dumping a frame buffer into logs is never useful.
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame() {
        let frame = Frame::filled(2, 4, 3, [1, 2, 3, 255]);
        assert!(frame.is_well_formed());
        assert_eq!(frame.data.len(), 48);
        assert_eq!(frame.pixel(3, 2), Some([1, 2, 3, 255]));
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn test_debug_omits_pixels() {
        let frame = Frame::filled(0, 2, 2, [0, 0, 0, 0]);
        let dbg = format!("{:?}", frame);
        assert!(dbg.contains("bytes: 16"));
    }
}
