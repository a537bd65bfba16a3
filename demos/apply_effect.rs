use fxpipe::{EffectSpec, FilterSession, PixelBuffer, SessionOpts};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(binary), Some(image_path), Some(fx)) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: apply_effect <interpreter-binary> <image> <effect-spec>");
        std::process::exit(2);
    };

    let rgba = image::open(&image_path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let input = PixelBuffer::from_rgba8(width, height, rgba.into_raw())?;

    let session = FilterSession::new(SessionOpts::new(
        binary,
        std::env::temp_dir().join("fxpipe-demo"),
    ))?;

    // The caller's thread stays free while the interpreter runs.
    let job = session.apply_in_background(input, EffectSpec::new(fx))?;
    eprintln!("applying effect...");
    let output = job.wait()?;

    let out_path = std::path::Path::new("target").join("apply_effect.png");
    image::save_buffer_with_format(
        &out_path,
        &output.data,
        output.width,
        output.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )?;

    eprintln!("wrote {}", out_path.display());
    Ok(())
}
