//! `svg2png`: render SVG files to PNG through headless Chrome.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use svgshot::batch::{single_job, BatchOptions, BatchProgress, BatchRasterizer, ConversionJob, ConversionResult};
use svgshot::{EngineConfig, RunSummary};

const AFTER_HELP: &str = r#"EXAMPLES:
  svg2png slide.svg                    # convert one file next to itself
  svg2png slide.svg out/slide.png      # explicit output file
  svg2png ./svg_output                 # whole directory into ../png_output
  svg2png ./svg_output ./png_output    # explicit output directory
  svg2png ./svg_output --scale 2       # double density
"#;

#[derive(Parser, Debug)]
#[command(name = "svg2png", version, about = "Render SVG files to PNG with headless Chrome", after_help = AFTER_HELP)]
struct Cli {
    /// SVG file or directory of SVG files
    input_path: PathBuf,

    /// PNG file or output directory (defaults next to the input)
    output_path: Option<PathBuf>,

    /// Output density multiplier
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Descend into subdirectories (default)
    #[arg(long, overrides_with = "no_recursive")]
    recursive: bool,

    /// Only convert files directly inside the input directory
    #[arg(long = "no-recursive", overrides_with = "recursive")]
    no_recursive: bool,

    /// Milliseconds to wait for the <svg> element to appear
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Browser executable to launch instead of the autodetected one
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// Disable the browser sandbox (needed as root in most containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> BatchOptions {
        BatchOptions {
            scale: self.scale,
            recursive: self.recursive || !self.no_recursive,
            selector_timeout_ms: self.timeout_ms,
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chrome_path: self.chrome.clone(),
            sandbox: !self.no_sandbox,
            ..Default::default()
        }
    }
}

/// Prints one line per job to stdout
struct ConsoleProgress {
    scale: f64,
    batch: bool,
}

impl BatchProgress for ConsoleProgress {
    fn on_batch_start(&self, total: usize, output_dir: &Path) {
        if total == 0 {
            println!("No SVG files found");
            return;
        }
        println!("Found {} SVG file(s)", total);
        println!("Output directory: {}", output_dir.display());
        println!("Scale: {}x", self.scale);
        println!();
    }

    fn on_job_start(&self, index: usize, total: usize, job: &ConversionJob) {
        if self.batch {
            println!("[{}/{}] {}", index, total, job.file_name());
        } else {
            println!("Converting: {}", job.file_name());
        }
    }

    fn on_job_complete(&self, _index: usize, _total: usize, result: &ConversionResult) {
        // Batch failures are listed once, in the summary.
        if self.batch {
            return;
        }
        match &result.error {
            None => println!("Done: {}", result.job.destination.display()),
            Some(err) => println!("Failed: {}", err),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let rule = "-".repeat(40);
    println!();
    println!("{}", rule);
    println!("Succeeded: {}", summary.success_count);
    println!("Failed:    {}", summary.fail_count);
    println!("{}", rule);

    if !summary.failures.is_empty() {
        println!();
        println!("Failed files:");
        for (name, err) in &summary.failures {
            println!("  - {}: {}", name, err);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

enum Mode {
    Single(ConversionJob),
    Batch(PathBuf),
}

fn run(cli: Cli) -> Result<()> {
    let options = cli.options();
    options.validate()?;

    // Resolve the input before launching the browser so bad paths never
    // start Chrome or create output.
    let mode = if cli.input_path.is_file() {
        Mode::Single(single_job(&cli.input_path, cli.output_path.as_deref())?)
    } else if cli.input_path.is_dir() {
        Mode::Batch(cli.input_path.clone())
    } else {
        bail!("path does not exist: {}", cli.input_path.display());
    };

    println!("SVG to PNG (headless Chrome)");
    println!("{}", "=".repeat(40));
    println!();
    let started = Instant::now();

    let engine = svgshot::new_engine(cli.engine_config()).context("could not start the browser")?;
    let progress = ConsoleProgress {
        scale: options.scale,
        batch: matches!(mode, Mode::Batch(_)),
    };
    let mut rasterizer = BatchRasterizer::new(engine, options).with_progress(Box::new(progress));

    match mode {
        Mode::Single(job) => {
            rasterizer.convert_single(&job.source, Some(job.destination.as_path()))?;
        }
        Mode::Batch(input_dir) => {
            println!("Scanning: {}", input_dir.display());
            rasterizer.convert_batch(&input_dir, cli.output_path.as_deref())?;
        }
    }

    if !rasterizer.summary().is_empty() {
        print_summary(rasterizer.summary());
    }
    rasterizer.close()?;

    println!();
    println!("Elapsed: {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
