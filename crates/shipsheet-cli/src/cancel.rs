//! Ctrl-C handling.
//!
//! The first interrupt flips the run-wide [`CancelToken`]: workers stop
//! picking up entries and in-flight engine processes are killed. A second
//! interrupt exits with status 130 once every child process still counted on
//! the token has been reaped.

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use shipsheet_core::CancelToken;

/// Exit status used when the user interrupts twice.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Upper bound on waiting for killed children after the second interrupt.
pub const ABORT_GRACE: Duration = Duration::from_secs(5);

/// Spawns a background thread that cancels `cancel` on Ctrl-C.
pub fn install_ctrl_c(cancel: CancelToken) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    std::thread::Builder::new()
        .name("shipsheet-signal".to_string())
        .spawn(move || {
            rt.block_on(async move {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                eprintln!(
                    "\n{} Interrupted; stopping in-flight renders (Ctrl+C again to abort)",
                    "WARN".yellow().bold()
                );
                cancel.cancel();

                if let Ok(()) = tokio::signal::ctrl_c().await {
                    eprintln!("{} Aborting", "FAIL".red().bold());
                    std::process::exit(abort(&cancel, ABORT_GRACE));
                }
            })
        })
        .context("Failed to spawn signal handler thread")?;

    Ok(())
}

/// Cancels the run and waits for supervised children to be killed and
/// reaped. Returns the exit status to abort with.
pub fn abort(cancel: &CancelToken, grace: Duration) -> i32 {
    cancel.cancel();
    if !cancel.wait_for_children(grace) {
        eprintln!(
            "{} {} engine process(es) still running",
            "WARN".yellow().bold(),
            cancel.live_children()
        );
    }
    INTERRUPTED_EXIT_CODE
}
