use std::process::ExitCode;

use engine::run_headless;
use tracing::info;

use super::bootstrap::AppWiring;

pub fn run(mut app: AppWiring) -> ExitCode {
    let outcome = run_headless(&app.loop_config, &mut app.scene, &mut app.input);
    app.audio.borrow_mut().flush();
    info!(
        ticks = outcome.ticks,
        reason = ?outcome.reason,
        state = ?app.scene.state(),
        resolved = app.scene.resolved_count(),
        play_time_seconds = app.scene.play_time_seconds(),
        music = app.audio.borrow().current_track().unwrap_or("none"),
        "session_finished"
    );
    ExitCode::SUCCESS
}
