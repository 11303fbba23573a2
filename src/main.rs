use clap::{Parser, Subcommand};
use fitframe::imaging::{FitPolicy, ResultImage, RustBackend, TransformRequest, transform_with};
use fitframe::store::{FsBlobStore, JsonlRecorder, MetadataRecorder, NullRecorder};
use fitframe::{config, logging, output, process};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fitframe")]
#[command(about = "Fit images into a fixed box by stretching, cropping or padding")]
#[command(long_about = "\
Fit images into a fixed box by stretching, cropping or padding

Every result is a PNG. The fit policy decides how the source aspect ratio
is reconciled with the target box:

  stretch        scale straight to the box (letterbox instead with --keep-aspect true)
  crop-to-fill   cover the box, then crop the overflow around the center
  pad-to-fit     fit inside the box, then pad the rest with --fill

Unset request fields fall back to [defaults] in the config file.

Batch job files are JSON arrays of requests naming a source blob:

  [
    {\"source\": \"cat.jpg\", \"width\": 300, \"height\": 200, \"policy\": \"crop-to-fill\"},
    {\"source\": \"logo.png\", \"policy\": \"pad-to-fit\", \"fill_color\": \"transparent\"}
  ]

Run 'fitframe gen-config' to generate a documented fitframe.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "fitframe.toml", global = true)]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

/// Request fields shared by the transform command.
#[derive(clap::Args, Clone)]
struct RequestArgs {
    /// Target width in pixels
    #[arg(long, allow_negative_numbers = true)]
    width: Option<i64>,

    /// Target height in pixels
    #[arg(long, allow_negative_numbers = true)]
    height: Option<i64>,

    /// Fit policy: stretch, crop-to-fill or pad-to-fit
    #[arg(long)]
    policy: Option<FitPolicy>,

    /// Padding color: hex (#rgb, #rrggbb, #rrggbbaa) or a name
    #[arg(long)]
    fill: Option<String>,

    /// Letterbox instead of distorting when stretching
    #[arg(long)]
    keep_aspect: Option<bool>,
}

impl From<RequestArgs> for TransformRequest {
    fn from(args: RequestArgs) -> Self {
        TransformRequest {
            width: args.width,
            height: args.height,
            policy: args.policy,
            preserve_aspect_ratio: args.keep_aspect,
            fill_color: args.fill,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Transform a single image file
    Transform {
        /// Source image
        input: PathBuf,

        /// Where to write the PNG result
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        request: RequestArgs,
    },
    /// Run a JSON job file against a blob store directory
    Batch {
        /// JSON array of jobs
        jobs: PathBuf,

        /// Blob store root; job sources are relative to it and results land in it
        #[arg(long)]
        store: PathBuf,

        /// Append one JSON record per transform to this file
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Print a stock fitframe.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        config: config_path,
        verbose,
        json_logs,
        command,
    } = Cli::parse();

    let load_config = || -> Result<config::Config, config::ConfigError> {
        let config = config::load_config(&config_path)?;
        logging::init_from_config(&config.logging, verbose, json_logs);
        Ok(config)
    };

    match command {
        Command::Transform {
            input,
            output: output_path,
            request,
        } => {
            let config = load_config()?;
            let spec = TransformRequest::from(request).resolve(&config.defaults)?;
            let source = std::fs::read(&input)?;
            let backend = RustBackend::with_limits(config.limits.clone());

            let result = transform_with(&backend, &source, &spec);
            if let ResultImage::Success(image) = &result {
                if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&output_path, &image.bytes)?;
            }
            output::print_transform_output(
                &input.display().to_string(),
                &output_path.display().to_string(),
                &spec,
                &result,
            );
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Command::Batch {
            jobs,
            store,
            records,
        } => {
            let config = load_config()?;
            init_thread_pool(&config.processing);
            let all_succeeded = match records {
                Some(path) => run_batch(&config, &jobs, &store, &JsonlRecorder::open(&path)?)?,
                None => run_batch(&config, &jobs, &store, &NullRecorder)?,
            };
            if !all_succeeded {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Run a job file, streaming progress to stdout. Returns whether every job
/// succeeded.
fn run_batch(
    config: &config::Config,
    jobs_path: &Path,
    store_root: &Path,
    recorder: &impl MetadataRecorder,
) -> Result<bool, Box<dyn std::error::Error>> {
    let jobs = process::load_jobs(jobs_path)?;
    let store = FsBlobStore::open(store_root)?;
    let backend = RustBackend::with_limits(config.limits.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let summary = process::process_batch(
        &backend,
        &store,
        recorder,
        &jobs,
        &config.defaults,
        Some(tx),
    );
    printer.join().map_err(|_| "output thread panicked")?;
    output::print_batch_summary(&summary);

    Ok(summary.all_succeeded())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
