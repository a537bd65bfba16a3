//! Decoding of the interpreter's declared output file.

use std::path::Path;

use crate::foundation::core::PixelBuffer;
use crate::foundation::error::{FxPipeError, FxPipeResult};

/// Decode the output file the external process declared it would write.
///
/// A missing file is a [`FxPipeError::Decode`] regardless of how the process
/// exited: an interpreter that fails silently simply leaves no output
/// behind, and this is where that surfaces. The container format is a fixed,
/// trusted contract (BMP for the reference interpreter); anything the
/// `image` crate reads losslessly is accepted, with no format negotiation.
pub fn decode_output(path: &Path) -> FxPipeResult<PixelBuffer> {
    if !path.exists() {
        return Err(FxPipeError::decode(format!(
            "output file '{}' does not exist (the effect process produced nothing)",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| FxPipeError::io(format!("read output file '{}': {e}", path.display())))?;
    let dyn_img = image::load_from_memory(&bytes).map_err(|e| {
        FxPipeError::decode(format!("decode output file '{}': {e}", path.display()))
    })?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelBuffer::from_rgba8(width, height, rgba.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fxpipe_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = temp_dir("decode_missing");
        let err = decode_output(&dir.join("never_written.bmp")).unwrap_err();
        assert!(matches!(err, FxPipeError::Decode(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_file_is_a_decode_error() {
        let dir = temp_dir("decode_garbage");
        let path = dir.join("garbage.bmp");
        std::fs::write(&path, b"not an image at all").unwrap();
        let err = decode_output(&path).unwrap_err();
        assert!(matches!(err, FxPipeError::Decode(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bmp_output_decodes_to_declared_pixels() {
        let dir = temp_dir("decode_bmp");
        let path = dir.join("out.bmp");

        let img = image::RgbaImage::from_raw(2, 1, vec![10, 20, 30, 255, 40, 50, 60, 255]).unwrap();
        image::DynamicImage::ImageRgba8(img)
            .save_with_format(&path, image::ImageFormat::Bmp)
            .unwrap();

        let buf = decode_output(&path).unwrap();
        assert_eq!((buf.width, buf.height), (2, 1));
        assert_eq!(buf.rgba_at(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(buf.rgba_at(1, 0), Some([40, 50, 60, 255]));

        std::fs::remove_dir_all(&dir).ok();
    }
}
