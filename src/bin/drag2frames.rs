use std::{io::BufRead, path::PathBuf, thread};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use drag2frames::{
    CropRegion, ExtractError, ExtractionEngine, ExtractionEvent, ExtractionSummary, FfmpegLogLevel,
    ScanReport, SelectionKind, Session,
};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  drag2frames scan videos/ --json\n  drag2frames extract videos/ --interval 4 --progress\n  drag2frames extract a.mp4 b.mp4 --out frames --crop 0,0,1280,720\n  drag2frames completions zsh > _drag2frames";

#[derive(Debug, Parser)]
#[command(
    name = "drag2frames",
    version,
    about = "Extract numbered JPEG frames from one or many videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, verbose, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stage a selection and report what would be extracted.
    #[command(
        about = "Scan files or a folder",
        after_help = "Examples:\n  drag2frames scan videos/\n  drag2frames scan a.mp4 b.mkv --json"
    )]
    Scan {
        /// A video file, a folder, or several video files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output the scan as machine-readable JSON.
        #[arg(long)]
        json: bool,

        /// Save the first frame of the first file as a JPEG.
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Extract frames from a selection.
    #[command(
        about = "Extract video frames",
        after_help = "Examples:\n  drag2frames extract clip.mp4\n  drag2frames extract videos/ --out frames --interval 9 --progress\n\nPress Enter while extracting to stop."
    )]
    Extract {
        /// A video file, a folder, or several video files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output root. Defaults to a path derived from the selection.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Skip this many frames after each kept frame.
        #[arg(long, default_value_t = 0)]
        interval: u32,

        /// Crop region as left,top,right,bottom (consistent batches only).
        #[arg(long, allow_hyphen_values = true)]
        crop: Option<CropRegion>,

        /// Show a progress bar per file.
        #[arg(long)]
        progress: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = match &global.log_level {
        Some(level) => level.parse::<FfmpegLogLevel>()?,
        None if global.verbose => FfmpegLogLevel::Info,
        None => FfmpegLogLevel::Error,
    };
    drag2frames::set_ffmpeg_log_level(level);
    Ok(())
}

fn selection_kind_name(kind: SelectionKind) -> &'static str {
    match kind {
        SelectionKind::SingleFile => "single_file",
        SelectionKind::Directory => "directory",
        SelectionKind::FileList => "file_list",
    }
}

fn print_scan(report: &ScanReport, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "kind": selection_kind_name(report.kind),
            "files": report
                .batch
                .files()
                .iter()
                .map(|file| file.display().to_string())
                .collect::<Vec<_>>(),
            "consistent": report.batch.is_consistent(),
            "dimensions": report.batch.dimensions().map(|(width, height)| json!({
                "width": width,
                "height": height,
            })),
            "first_file": report.reference_info.map(|info| json!({
                "width": info.width,
                "height": info.height,
                "duration_seconds": info.duration_seconds(),
                "fps": info.frames_per_second,
            })),
            "default_output_root": report.default_output_root.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{report}");
    for file in report.batch.files() {
        println!("  {}", file.display());
    }
    println!("Output: {}", report.default_output_root.display());
    Ok(())
}

/// Stop the job when the user presses Enter. Exits quietly on EOF.
fn spawn_stop_listener(engine: ExtractionEngine) {
    let spawned = thread::Builder::new()
        .name("drag2frames-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            if let Ok(read) = std::io::stdin().lock().read_line(&mut line) {
                if read > 0 && engine.stop() {
                    eprintln!("{} {}", "warning:".yellow().bold(), "stopping...".yellow());
                }
            }
        });
    if let Err(error) = spawned {
        log::warn!("Cannot listen for stop requests: {error}");
    }
}

fn new_file_bar(index: usize, total: usize, file_name: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos:>3}% {msg}")?;
    bar.set_style(style.progress_chars("##-"));
    bar.set_message(format!("[{index}/{total}] {file_name}"));
    Ok(bar)
}

fn print_summary(summary: &ExtractionSummary, output_root: &std::path::Path) {
    let message = format!(
        "Wrote {} frame(s) from {} file(s) to {}",
        summary.frames_written,
        summary.files_processed,
        output_root.display()
    );

    if summary.cancelled {
        println!("{} {}", "stopped:".yellow().bold(), message.yellow());
    } else {
        println!("{} {}", "success:".green().bold(), message.green());
    }
    if summary.files_skipped > 0 {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{} file(s) skipped", summary.files_skipped).yellow()
        );
    }
    if summary.frame_failures > 0 {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{} frame(s) could not be written", summary.frame_failures).yellow()
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Scan {
            inputs,
            json,
            preview,
        } => {
            let mut session = Session::default();
            session.select_files(inputs)?;
            let report = session.report().ok_or("nothing was staged")?;
            print_scan(report, json)?;

            if let Some(path) = preview {
                let frame = report
                    .preview
                    .as_ref()
                    .ok_or("the first file produced no preview frame")?;
                frame.write_jpeg(&path)?;
                println!("{} {}", "saved".green().bold(), path.display());
            }
        }
        Commands::Extract {
            inputs,
            out,
            interval,
            crop,
            progress,
        } => {
            let mut session = Session::default();
            session.select_files(inputs)?;
            if let Some(out) = out {
                session.set_output_root(out)?;
            }
            session.set_interval(interval)?;

            if let Some(region) = crop {
                let consistent = session
                    .report()
                    .is_some_and(|report| report.batch.dimensions().is_some());
                if !consistent {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "resolutions differ across the batch; --crop is ignored".yellow()
                    );
                }
                session.set_crop(region)?;
            }

            if let Some(report) = session.report() {
                eprintln!("{report}");
            }

            let job = session.start()?;
            spawn_stop_listener(session.engine().clone());

            let mut bar: Option<ProgressBar> = None;
            let mut finished = None;
            for event in job.events() {
                match event {
                    ExtractionEvent::Started { total_files } => {
                        log::debug!("Worker started on {total_files} file(s)");
                    }
                    ExtractionEvent::FileStarted {
                        index,
                        total,
                        file_name,
                    } => {
                        if let Some(previous) = bar.take() {
                            previous.finish();
                        }
                        if progress {
                            bar = Some(new_file_bar(index, total, &file_name)?);
                        } else {
                            eprintln!("Extracting {index}/{total}: {file_name}");
                        }
                    }
                    ExtractionEvent::FileSkipped { path, reason } => {
                        let message = format!("skipped {}: {reason}", path.display());
                        match &bar {
                            Some(bar) => bar.println(message),
                            None => eprintln!("{} {}", "warning:".yellow().bold(), message.yellow()),
                        }
                    }
                    ExtractionEvent::Progress { percent, .. } => {
                        if let Some(bar) = &bar {
                            bar.set_position(u64::from(percent));
                        }
                    }
                    ExtractionEvent::Finished(summary) => {
                        finished = Some(summary);
                    }
                }
            }

            if let Some(bar) = bar {
                bar.finish();
            }

            let summary = match finished {
                Some(summary) => summary,
                None => job.wait()?,
            };
            print_summary(&summary, session.output_root());
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "drag2frames", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Exit status for a failed run: 2 when the request itself was unusable
/// (empty output path, nothing to extract, job already running), 1 otherwise.
fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<ExtractError>() {
        Some(error) if error.is_config_error() => 2,
        _ => 1,
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(exit_code(error.as_ref()));
    }
}
