use std::io::Write as _;
use std::path::Path;

use crate::foundation::core::PixelBuffer;
use crate::foundation::error::{FxPipeError, FxPipeResult};

/// Format tag of the binary RGB-triple PPM variant.
pub const PPM_MAGIC: &str = "P6";

/// Fixed maximum channel value written to and required from headers.
pub const PPM_MAXVAL: u32 = 255;

/// Header for a `width` x `height` raw pixel file.
///
/// The byte layout is a wire contract with the external interpreter,
/// including the space before each newline: `"P6 \n<w> <h> \n255 \n"`.
pub fn ppm_header(width: u32, height: u32) -> String {
    format!("{PPM_MAGIC} \n{width} {height} \n{PPM_MAXVAL} \n")
}

/// Encode a pixel buffer as a binary PPM byte vector.
///
/// Alpha is dropped; R, G, B are written one byte per channel in row-major
/// order. Channel values pass through unchanged.
pub fn encode_ppm(buf: &PixelBuffer) -> Vec<u8> {
    let header = ppm_header(buf.width, buf.height);
    let mut out = Vec::with_capacity(header.len() + buf.pixel_count() * 3);
    out.extend_from_slice(header.as_bytes());
    for px in buf.data.chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    out
}

/// Write `buf` as a binary PPM at `path`, creating or overwriting the file.
pub fn write_ppm(path: &Path, buf: &PixelBuffer) -> FxPipeResult<()> {
    let file = std::fs::File::create(path).map_err(|e| {
        FxPipeError::io(format!(
            "create raw pixel file '{}': {e}",
            path.display()
        ))
    })?;
    let mut w = std::io::BufWriter::new(file);

    let write_err =
        |e: std::io::Error| FxPipeError::io(format!("write raw pixel file '{}': {e}", path.display()));

    w.write_all(ppm_header(buf.width, buf.height).as_bytes())
        .map_err(write_err)?;
    for px in buf.data.chunks_exact(4) {
        w.write_all(&px[..3]).map_err(write_err)?;
    }
    w.flush().map_err(write_err)
}

/// Read a binary PPM written by [`write_ppm`] back into a pixel buffer.
///
/// The header is parsed line-wise, so the trailing space before each newline
/// is tolerated the same way the interpreter tolerates it. Alpha comes back
/// fully opaque. Maxval must be 255.
pub fn read_ppm(path: &Path) -> FxPipeResult<PixelBuffer> {
    let bytes = std::fs::read(path).map_err(|e| {
        FxPipeError::io(format!("read raw pixel file '{}': {e}", path.display()))
    })?;
    parse_ppm(&bytes)
}

fn next_header_line<'a>(rest: &mut &'a [u8]) -> FxPipeResult<&'a str> {
    let cur: &'a [u8] = *rest;
    let end = cur
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| FxPipeError::decode("raw pixel header truncated"))?;
    let line = std::str::from_utf8(&cur[..end])
        .map_err(|_| FxPipeError::decode("raw pixel header is not ascii"))?;
    *rest = &cur[end + 1..];
    Ok(line.trim())
}

fn parse_ppm(bytes: &[u8]) -> FxPipeResult<PixelBuffer> {
    let mut rest = bytes;

    let magic = next_header_line(&mut rest)?;
    if magic != PPM_MAGIC {
        return Err(FxPipeError::decode(format!(
            "raw pixel header magic '{magic}' is not '{PPM_MAGIC}'"
        )));
    }

    let dims = next_header_line(&mut rest)?;
    let mut it = dims.split_whitespace();
    let (w, h) = match (it.next(), it.next(), it.next()) {
        (Some(w), Some(h), None) => (w, h),
        _ => {
            return Err(FxPipeError::decode(format!(
                "raw pixel header dimensions line '{dims}' is malformed"
            )));
        }
    };
    let width: u32 = w
        .parse()
        .map_err(|_| FxPipeError::decode(format!("invalid raw pixel width '{w}'")))?;
    let height: u32 = h
        .parse()
        .map_err(|_| FxPipeError::decode(format!("invalid raw pixel height '{h}'")))?;

    let maxval = next_header_line(&mut rest)?;
    if maxval.parse::<u32>().ok() != Some(PPM_MAXVAL) {
        return Err(FxPipeError::decode(format!(
            "raw pixel maxval '{maxval}' is not {PPM_MAXVAL}"
        )));
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| FxPipeError::decode("raw pixel dimensions overflow"))?;
    if rest.len() != expected {
        return Err(FxPipeError::decode(format!(
            "raw pixel payload is {} bytes, expected {expected} ({width}x{height}x3)",
            rest.len()
        )));
    }

    PixelBuffer::from_rgb8(width, height, rest)
}
