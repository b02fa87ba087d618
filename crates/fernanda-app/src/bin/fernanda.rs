use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::info;

use fernanda_app::{app_dirs, Application, Cli, StartCop};

/// Working directories orphaned by a crash are swept once they're clearly
/// abandoned.
const STALE_WORKDIR_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let args: Vec<String> = cli
        .paths
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    // Only one instance runs; a second forwards its arguments and defers.
    let mut cop = StartCop::new("fernanda");
    if cop.exists(&args) {
        return ExitCode::SUCCESS;
    }

    fernanda_core::workdir::sweep_stale(&app_dirs::temp(), STALE_WORKDIR_AGE);

    let mut app = Application::new(cli.dev);
    app.dispatch(&cli.paths);

    // Pick up anything a second instance forwarded while we were opening.
    let forwarded: Vec<std::path::PathBuf> = cop
        .poll_forwarded()
        .into_iter()
        .map(std::path::PathBuf::from)
        .collect();
    if !forwarded.is_empty() {
        info!("dispatching {} forwarded argument(s)", forwarded.len());
        app.dispatch(&forwarded);
    }

    app.summarize();
    ExitCode::SUCCESS
}
