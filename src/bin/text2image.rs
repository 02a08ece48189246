//! `text2image`: generate an image from a text prompt and save it to disk.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use svgshot::imagegen::{
    preview, GenerationRequest, ImageGenClient, ImageGenConfig, ImageSize, API_KEY_ENV,
    DEFAULT_ENDPOINT, DEFAULT_MODEL,
};

const AFTER_HELP: &str = r#"EXAMPLES:
  text2image "abstract tech background, deep blue gradient" -o images/bg.png
  text2image "team collaboration" -s "1280*720" -o images/team.png
  text2image "product showcase" -s "720*1280" -o images/product.png

SUPPORTED SIZES:
  1280*1280 (1:1, recommended)   1024*1024 (1:1)
  1280*720  (16:9)               1696*960  (16:9, high resolution)
  720*1280  (9:16)               960*1696  (9:16, high resolution)
  1104*1472 (3:4)                1472*1104 (4:3)

The API key is read from the BAILIAN_KEY environment variable.
"#;

#[derive(Parser, Debug)]
#[command(name = "text2image", version, about = "Generate an image from a text prompt", after_help = AFTER_HELP)]
struct Cli {
    /// Description of the image to generate
    prompt: String,

    /// Image size as WIDTH*HEIGHT
    #[arg(short, long, default_value = "1280*1280")]
    size: ImageSize,

    /// Where to save the image
    #[arg(short, long)]
    output: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Generation endpoint
    #[arg(long, env = "BAILIAN_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// `println!` unless `--quiet`
macro_rules! say {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            println!($($arg)*);
        }
    };
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

fn run(cli: Cli) -> Result<()> {
    let mut config = ImageGenConfig::from_env()
        .with_context(|| format!("{} is required to call the image service", API_KEY_ENV))?;
    config.model = cli.model.clone();
    config.endpoint = cli.endpoint.clone();

    let client = ImageGenClient::new(config)?;
    let request = GenerationRequest::new(cli.prompt.as_str()).with_size(cli.size);

    say!(cli.quiet, "Generating image...");
    say!(cli.quiet, "  Prompt: {}", preview(&request.prompt, 80));
    say!(cli.quiet, "  Size:   {}", request.size);

    let image_url = client.generate(&request).context("generation failed")?;
    say!(cli.quiet, "Image generated");
    say!(cli.quiet, "  URL: {}", image_url);

    say!(cli.quiet, "Downloading to: {}", cli.output.display());
    let bytes = client
        .download(&image_url, &cli.output)
        .with_context(|| format!("could not save {}", cli.output.display()))?;
    say!(cli.quiet, "Saved ({:.1} KB)", bytes as f64 / 1024.0);

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
