//!
//!
//!
use clap::Parser;
use log::info;
use scc_tokenizer::language::LanguageProfile;
use scc_tokenizer::output::OutputLayout;
use scc_tokenizer::pool::{self, RunContext};
use scc_tokenizer::settings::Settings;
use scc_tokenizer::tokenize::Granularity;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Tokenizes a batch of project archives into the per-worker sidecar streams
/// the clone detector consumes.
#[derive(Debug, Parser)]
#[command(name = "scc_tokenizer", version)]
struct Cli {
    /// Path to the INI configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Record granularity: whole files, or extracted function blocks
    #[arg(long, value_enum, default_value = "file")]
    granularity: Granularity,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    env_logger::init();

    let cli = Cli::parse();

    // Load settings
    let settings: Settings = Settings::new(&cli.config)?;
    // Should have the settings fully loaded and trusted at this point.

    let profile = LanguageProfile::from_settings(&settings.language)?;
    // Refuses to run against pre-existing output folders.
    let layout = OutputLayout::bootstrap(&settings.folders)?;
    let projects = pool::read_project_list(&settings.main.file_projects_list)?;

    info!("*** Starting regular projects...");
    let context = RunContext {
        profile,
        layout,
        granularity: cli.granularity,
        proj_id_flag: settings.config.init_proj_id,
        init_file_id: settings.config.init_file_id,
    };
    let total_files = pool::run(
        context,
        projects,
        settings.main.n_processes,
        settings.main.projects_batch,
    )?;

    info!("*** All done. {} files processed.", total_files);
    print_exec_duration(start.elapsed());
    Ok(())
}

/// prints the execution time for the application at info log level
fn print_exec_duration(duration: Duration) {
    let duration_secs = duration.as_secs();
    let minutes = duration_secs / 60;
    let seconds = duration_secs % 60;
    let millis = duration.subsec_millis();

    info!(
        "TOTAL EXECUTION TIME: {} minutes, {} seconds, and {} milliseconds",
        minutes, seconds, millis
    );
}
