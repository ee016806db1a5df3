use captioneer::config::{DEFAULT_CROP_HEIGHT, DEFAULT_CROP_WIDTH};
use captioneer::error::BatchReport;
use captioneer::services::{CropSession, LibraryService};
use captioneer::state::AppState;
use captioneer::{AppError, caption_store};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "captioneer",
    version,
    about = "Manage caption files and crop images in an image dataset directory"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List images with their captions, creating missing caption files
    Scan {
        /// Directory to scan (default: remembered or configured directory)
        dir: Option<PathBuf>,
    },
    /// Wrap every line of every caption file with a prefix and suffix
    PrefixSuffix {
        dir: PathBuf,
        #[arg(allow_hyphen_values = true)]
        prefix: String,
        #[arg(allow_hyphen_values = true)]
        suffix: String,
    },
    /// Replace text in every caption file
    FindReplace {
        dir: PathBuf,
        #[arg(allow_hyphen_values = true)]
        find: String,
        #[arg(allow_hyphen_values = true)]
        replace: String,
    },
    /// Crop every image to the output ratio and resize it in place
    Crop {
        dir: PathBuf,
        #[arg(default_value_t = DEFAULT_CROP_WIDTH)]
        width: u32,
        #[arg(default_value_t = DEFAULT_CROP_HEIGHT)]
        height: u32,
    },
}

fn report_failures(what: &str, report: &BatchReport) -> bool {
    for (path, e) in &report.failures {
        error!("{} failed for {}: {}", what, path.display(), e);
    }
    info!(
        "{}: {} done, {} failed",
        what,
        report.processed,
        report.failure_count()
    );
    report.is_success()
}

fn scan(state: &AppState, dir: Option<PathBuf>) -> captioneer::Result<bool> {
    let dir = dir
        .or_else(|| state.startup_directory())
        .ok_or_else(|| AppError::DirectoryNotFound(PathBuf::new()))?;

    let library = LibraryService::new(state.images.clone());
    let report = library.open_directory(&dir)?;
    state
        .settings
        .store_last_directory(&state.last_directory_path(), &dir)?;

    let mut paths = library.image_paths();
    paths.sort();
    for path in &paths {
        let caption = caption_store::read_caption(path)?;
        println!("{}\t{}", path.display(), caption.trim_end());
    }
    Ok(report_failures("scan", &report))
}

fn crop(dir: &Path, width: u32, height: u32) -> captioneer::Result<bool> {
    let (images, _) = caption_store::scan(dir)?;
    let session = CropSession::open(images.paths(), width, height)?;
    let skipped_ok = session.skipped().is_empty();
    for (path, e) in session.skipped() {
        error!("crop skipped {}: {}", path.display(), e);
    }
    let report = session.commit();
    Ok(report_failures("crop", &report) && skipped_ok)
}

fn run(command: Command) -> captioneer::Result<bool> {
    let config_dir = std::env::current_dir().map_err(|e| AppError::io(".", e))?;
    let state = AppState::load(&config_dir)?;

    match command {
        Command::Scan { dir } => scan(&state, dir),
        Command::PrefixSuffix {
            dir,
            prefix,
            suffix,
        } => {
            let report = caption_store::add_prefix_suffix(&dir, &prefix, &suffix)?;
            Ok(report_failures("prefix/suffix", &report))
        }
        Command::FindReplace { dir, find, replace } => {
            let report = caption_store::find_replace(&dir, &find, &replace)?;
            Ok(report_failures("find/replace", &report))
        }
        Command::Crop { dir, width, height } => crop(&dir, width, height),
    }
}

fn main() -> ExitCode {
    let mut logger = env_logger::Builder::from_default_env();
    #[cfg(debug_assertions)]
    logger.filter_level(log::LevelFilter::Debug);
    logger.init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
