mod app;

use std::io;

use gridfall_engine::{run_app, StdinLines};
use tracing::{error, info};

fn main() {
    let wiring = match app::build_app() {
        Ok(wiring) => wiring,
        Err(err) => {
            error!(error = %err, "startup_failed");
            std::process::exit(1);
        }
    };

    let mut lines = StdinLines::spawn();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run_app(wiring.config, wiring.factory, &mut lines, &mut out) {
        Ok(summary) => info!(
            outcome = ?summary.outcome,
            ticks = summary.ticks,
            reloads = summary.reloads,
            level = %summary.scene_name,
            "session_finished"
        ),
        Err(err) => {
            error!(error = %err, "session_failed");
            std::process::exit(1);
        }
    }
}
