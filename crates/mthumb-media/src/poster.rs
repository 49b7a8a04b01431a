//! Still poster image.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use mthumb_models::Frame;

use crate::error::{MediaError, MediaResult};

/// Write `frame` as a JPEG at `path`, compositing alpha over `background`.
///
/// Returns the size of the written file. Blocking.
pub fn write_poster(frame: &Frame, path: &Path, quality: u8, background: [u8; 3]) -> MediaResult<u64> {
    if !frame.is_well_formed() {
        return Err(MediaError::invalid_sequence(format!(
            "poster frame {} has {} bytes for {}x{}",
            frame.index,
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }

    let rgb = flatten_to_rgb(&frame.data, background);

    let mut writer = BufWriter::new(File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode(&rgb, frame.width, frame.height, ColorType::Rgb8)?;
    writer.flush()?;
    drop(writer);

    Ok(std::fs::metadata(path)?.len())
}

/// Straight-alpha RGBA8 to opaque RGB8.
fn flatten_to_rgb(rgba: &[u8], background: [u8; 3]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = px[3] as u16;
        let inv = 255 - a;
        for c in 0..3 {
            let blended = mul_div255(px[c] as u16, a) + mul_div255(background[c] as u16, inv);
            rgb.push(blended.min(255) as u8);
        }
    }
    rgb
}

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_opaque_is_identity() {
        let rgb = flatten_to_rgb(&[10, 20, 30, 255], [0, 0, 0]);
        assert_eq!(rgb, vec![10, 20, 30]);
    }

    #[test]
    fn test_flatten_half_alpha_over_white() {
        let rgb = flatten_to_rgb(&[0, 0, 0, 128], [255, 255, 255]);
        assert_eq!(rgb, vec![127, 127, 127]);
    }

    #[test]
    fn test_write_poster_produces_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poster.jpg");
        let frame = Frame::filled(0, 16, 16, [200, 40, 40, 255]);

        let size = write_poster(&frame, &path, 85, [255, 255, 255]).unwrap();
        assert!(size > 0);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_malformed_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut frame = Frame::filled(0, 4, 4, [0, 0, 0, 255]);
        frame.data.truncate(10);
        let err = write_poster(&frame, &dir.path().join("p.jpg"), 85, [0, 0, 0]).unwrap_err();
        assert!(matches!(err, MediaError::InvalidSequence(_)));
    }
}
