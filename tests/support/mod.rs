#![allow(dead_code)]

use std::path::{Path, PathBuf};

use fxpipe::PixelBuffer;

/// Fresh per-test directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
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

/// Write an executable `/bin/sh` stub standing in for the interpreter.
#[cfg(unix)]
pub fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt as _;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Deterministic opaque test image.
pub fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[
                (x * 17 % 256) as u8,
                (y * 31 % 256) as u8,
                ((x + y) * 11 % 256) as u8,
                255,
            ]);
        }
    }
    PixelBuffer::from_rgba8(width, height, data).unwrap()
}

/// Save a buffer as the BMP fixture a stub copies to its `-output` path.
pub fn write_bmp_fixture(path: &Path, buf: &PixelBuffer) {
    let img = image::RgbaImage::from_raw(buf.width, buf.height, buf.data.clone()).unwrap();
    image::DynamicImage::ImageRgba8(img)
        .save_with_format(path, image::ImageFormat::Bmp)
        .unwrap();
}

/// Stub body that copies `src` to whatever path follows `-output`.
pub fn copy_to_output_body(src: &Path) -> String {
    format!(
        r#"out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-output" ]; then out="$a"; fi
  prev="$a"
done
cp "{}" "$out"
echo "stub effect applied" >&2"#,
        src.display()
    )
}
