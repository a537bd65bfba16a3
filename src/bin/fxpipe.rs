use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use fxpipe::{EffectSpec, FilterSession, PixelBuffer, SessionOpts, SupportBundle, SupportSource, TempStrategy};

#[derive(Parser, Debug)]
#[command(name = "fxpipe", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply one effect to an image file.
    Apply(ApplyArgs),
    /// Run a job described by a JSON file.
    Job(JobArgs),
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input image (any format the `image` crate reads).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image path; format follows the extension.
    #[arg(long)]
    out: PathBuf,

    /// Effect specification passed to the interpreter untouched,
    /// e.g. "fx_bokeh 3,8,0,30,8,4,0.3,0.2,210,210,80,160,0.7,30,20,20,1,2,170,130,20,110,0.15,0".
    #[arg(long)]
    fx: String,

    /// Path to the interpreter binary.
    #[arg(long)]
    binary: PathBuf,

    /// Cache/scratch directory (default: a per-user temp subdirectory).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Support-data file to cache next to the interpreter's scratch space
    /// on first use.
    #[arg(long)]
    support: Option<PathBuf>,

    /// Use the fixed reference temp-file names instead of per-run names.
    #[arg(long, default_value_t = false)]
    fixed_temp: bool,
}

#[derive(Parser, Debug)]
struct JobArgs {
    /// Job description JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(serde::Deserialize, Debug)]
struct JobFile {
    input: PathBuf,
    output: PathBuf,
    fx: String,
    binary: PathBuf,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    support: Option<SupportBundle>,
    #[serde(default)]
    temp_strategy: Option<TempStrategy>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Apply(args) => cmd_apply(args),
        Command::Job(args) => cmd_job(args),
    }
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("fxpipe")
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let mut opts = SessionOpts::new(args.binary, args.cache_dir.unwrap_or_else(default_cache_dir));
    if args.fixed_temp {
        opts.temp_strategy = TempStrategy::Fixed;
    }
    if let Some(path) = args.support {
        let rel_path = path
            .file_name()
            .context("support file path has no file name")?
            .to_string_lossy()
            .into_owned();
        opts.support = Some(SupportBundle {
            rel_path,
            source: SupportSource::File(path),
        });
    }

    run_job(opts, &args.in_path, &args.out, EffectSpec::new(args.fx))
}

fn cmd_job(args: JobArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read job file '{}'", args.in_path.display()))?;
    let job: JobFile = serde_json::from_str(&text)
        .with_context(|| format!("parse job file '{}'", args.in_path.display()))?;

    let mut opts = SessionOpts::new(job.binary, job.cache_dir.unwrap_or_else(default_cache_dir));
    opts.support = job.support;
    if let Some(strategy) = job.temp_strategy {
        opts.temp_strategy = strategy;
    }

    run_job(opts, &job.input, &job.output, EffectSpec::new(job.fx))
}

fn run_job(
    opts: SessionOpts,
    in_path: &Path,
    out_path: &Path,
    spec: EffectSpec,
) -> anyhow::Result<()> {
    let rgba = image::open(in_path)
        .with_context(|| format!("open input image '{}'", in_path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let input = PixelBuffer::from_rgba8(width, height, rgba.into_raw())?;

    let session = FilterSession::new(opts)?;
    let output = session.apply(&input, &spec)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let img = image::RgbaImage::from_raw(output.width, output.height, output.data)
        .context("decoded buffer has inconsistent dimensions (unexpected)")?;
    img.save(out_path)
        .with_context(|| format!("write output image '{}'", out_path.display()))?;

    eprintln!("wrote {}", out_path.display());
    Ok(())
}
