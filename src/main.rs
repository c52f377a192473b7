#[macro_use]
extern crate log;

mod comparer;
mod metrics;
mod planner;
mod progress_reporter;
mod shared_types;
mod validation;
mod worker;

use std::error::Error;
use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::{ArgAction, Parser};
use comparer::{start_comparison, ComparePreferences};
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, ThreadLogMode};

use shared_types::{ByteCount, RunOutcome};
use validation::{MAX_TASKS, MIN_TASKS};

/// Buffer memory per worker when no budget is given, split between both files.
const DEFAULT_MEMORY_PER_TASK: ByteCount = 2 * 64 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    file1: PathBuf,

    file2: PathBuf,

    /// Number of parallel workers [default: available cores, within 2..=32]
    task_count: Option<usize>,

    /// Total buffer bytes across all workers, divisible by (task count * 2)
    available_bytes: Option<ByteCount>,

    #[arg(short, long)]
    progress: bool,

    /// Log elapsed time and total bytes read
    #[arg(short, long)]
    measure: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn default_task_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(MIN_TASKS)
        .clamp(MIN_TASKS, MAX_TASKS)
}

// redirected diagnostics stay free of escape codes
fn color_choice() -> ColorChoice {
    if io::stderr().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn init_logging(verbosity: u8, multi: MultiProgress) -> Result<(), Box<dyn Error>> {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Error)
        .set_thread_mode(ThreadLogMode::IDs)
        .build();
    let logger = TermLogger::new(level, config, TerminalMode::Stderr, color_choice());

    LogWrapper::new(multi, *logger).try_init()?;
    log::set_max_level(level);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let multi = MultiProgress::new();
    if let Err(e) = init_logging(args.verbose, multi.clone()) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::from(RunOutcome::OtherError.exit_code());
    }

    let task_count = args.task_count.unwrap_or_else(default_task_count);
    let available_bytes = args
        .available_bytes
        .unwrap_or_else(|| (task_count as ByteCount).saturating_mul(DEFAULT_MEMORY_PER_TASK));

    let specs = ComparePreferences {
        file1: args.file1,
        file2: args.file2,
        task_count,
        available_bytes,
        show_progress: args.progress,
        measure: args.measure,
    };
    let outcome = start_comparison(specs, multi).await;
    debug!("finished with {outcome:?}");

    ExitCode::from(outcome.exit_code())
}
