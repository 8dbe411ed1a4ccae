use clap::{Parser, Subcommand, ValueEnum};
use fast_image::{Config, config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup; called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "fast-image")]
#[command(about = "Compress and rotate PNG/JPEG images with the bundled native codec")]
#[command(long_about = "\
Compress and rotate PNG/JPEG images with the bundled native codec

The codec library for this platform is extracted to a temporary file and
loaded on first use. Output always keeps the input's format.

Platforms: windows, linux and macos on x86_64 or aarch64.

Environment:
  FAST_IMAGE_CONFIG        config file (same as --config)
  FAST_IMAGE_RESOURCE_DIR  directory searched for native/<library> first
  FAST_IMAGE_TEMP_DIR      where the library is extracted
  RUST_LOG                 log filter (default: warn)

Run 'fast-image gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log loader and batch activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    High,
    Medium,
    Low,
}

#[derive(Subcommand)]
enum Command {
    /// Show platform detection and native library status
    Info,
    /// Check that the native library loads and rejects malformed input
    SelfTest,
    /// Recompress an image, keeping its format
    Compress {
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Quality, 0 (smallest) to 100 (best). Defaults to batch.quality
        #[arg(short, long, conflicts_with = "preset")]
        quality: Option<i32>,
        /// Named quality: high (90), medium (60), low (30)
        #[arg(long, value_enum)]
        preset: Option<Preset>,
    },
    /// Rotate an image clockwise, keeping its format
    Rotate {
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// 90, 180 or 270
        #[arg(short, long, allow_negative_numbers = true)]
        angle: i32,
    },
    /// Compress and rotate every image in a directory
    Batch {
        input: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "processed")]
        output: PathBuf,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    fast_image::initialize(&config);

    match cli.command {
        Command::Info => {
            output::print_info(&fast_image::platform_info());
        }
        Command::SelfTest => {
            let passed = fast_image::test_library();
            let reason = failure_reason(passed);
            output::print_self_test(passed, reason.as_deref());
            if !passed {
                std::process::exit(1);
            }
        }
        Command::Compress {
            input,
            output: dest,
            quality,
            preset,
        } => {
            let image = std::fs::read(&input)?;
            let result = match (preset, quality) {
                (Some(Preset::High), _) => fast_image::compress_high(&image)?,
                (Some(Preset::Medium), _) => fast_image::compress_medium(&image)?,
                (Some(Preset::Low), _) => fast_image::compress_low(&image)?,
                (None, q) => fast_image::compress(&image, q.unwrap_or(config.batch.quality))?,
            };
            write_output(&dest, &result)?;
            output::print_transform(&input, &dest, &image, &result);
        }
        Command::Rotate {
            input,
            output: dest,
            angle,
        } => {
            let image = std::fs::read(&input)?;
            let result = fast_image::rotate(&image, angle)?;
            write_output(&dest, &result)?;
            output::print_transform(&input, &dest, &image, &result);
        }
        Command::Batch { input, output: dest } => {
            init_thread_pool(&config.batch);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = fast_image::batch::process_dir(
                &fast_image::api(),
                &input,
                &dest,
                &config.batch,
                Some(tx),
            )?;
            printer.join().ok();
            output::print_batch_summary(&report);
        }
        // printed before the bootstrap
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initialize the rayon thread pool based on batch config.
///
/// Caps at the number of available CPU cores. The user can constrain down, not up.
fn init_thread_pool(batch: &config::BatchConfig) {
    let threads = config::effective_threads(batch);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn failure_reason(passed: bool) -> Option<String> {
    if passed {
        return None;
    }
    match fast_image::state().failure() {
        Some(err) => Some(format!("{}: {}", err, err.cause)),
        None => Some("codec did not reject a malformed image".to_string()),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}
