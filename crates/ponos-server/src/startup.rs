//! Startup output.

use tracing::info;

/// Prints the startup banner.
pub fn print_banner(version: &str, pid: u32) {
    info!(r#"
    ____
   / __ \____  ____  ____  _____
  / /_/ / __ \/ __ \/ __ \/ ___/
 / ____/ /_/ / / / / /_/ (__  )
/_/    \____/_/ /_/\____/____/
    "#);
    info!(module = "boot", "Hello! Ponos {} booting up under PID {}...", version, pid);
}

/// Prints how to talk to the running process.
pub fn print_usage() {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Sending signal USR1 displays information about the schedule and next runs");
    info!("               USR2 dumps Redis commands used to perform all jobs (dry-run test)");
    info!("               SIGTERM gracefully stops Ponos");
    info!("{}", separator);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_banner_does_not_panic() {
        let _ = tracing_subscriber::fmt::try_init();
        print_banner(env!("CARGO_PKG_VERSION"), std::process::id());
    }

    #[test]
    fn test_print_usage_does_not_panic() {
        let _ = tracing_subscriber::fmt::try_init();
        print_usage();
    }
}
