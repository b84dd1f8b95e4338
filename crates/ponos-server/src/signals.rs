//! Translates process signals into control commands.
//!
//! | Signal            | Command          |
//! |-------------------|------------------|
//! | `SIGUSR1`         | `ReportSchedule` |
//! | `SIGUSR2`         | `DryRunAll`      |
//! | `SIGINT`/`SIGTERM`| `Shutdown`       |

use ponos_jobs::ControlCommand;
use std::io;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Command for a signal, if Ponos reacts to it.
#[cfg(unix)]
pub fn command_for(kind: SignalKind) -> Option<ControlCommand> {
    if kind == SignalKind::user_defined1() {
        Some(ControlCommand::ReportSchedule)
    } else if kind == SignalKind::user_defined2() {
        Some(ControlCommand::DryRunAll)
    } else if kind == SignalKind::interrupt() || kind == SignalKind::terminate() {
        Some(ControlCommand::Shutdown)
    } else {
        None
    }
}

/// Installs the handlers and forwards commands to `commands` until shutdown
/// is requested or the receiver goes away.
#[cfg(unix)]
pub fn spawn_listener(commands: mpsc::Sender<ControlCommand>) -> io::Result<JoinHandle<()>> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let kind = tokio::select! {
                _ = usr1.recv() => SignalKind::user_defined1(),
                _ = usr2.recv() => SignalKind::user_defined2(),
                _ = interrupt.recv() => SignalKind::interrupt(),
                _ = terminate.recv() => SignalKind::terminate(),
            };

            let Some(command) = command_for(kind) else {
                continue;
            };
            if !forward(&commands, command).await {
                break;
            }
        }
    }))
}

/// Only Ctrl+C is available off unix; it requests shutdown.
#[cfg(not(unix))]
pub fn spawn_listener(commands: mpsc::Sender<ControlCommand>) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            forward(&commands, ControlCommand::Shutdown).await;
        }
    }))
}

/// Sends `command`; false once no more commands should follow.
async fn forward(commands: &mpsc::Sender<ControlCommand>, command: ControlCommand) -> bool {
    match command {
        ControlCommand::Shutdown => info!("Received termination signal. Stopping..."),
        ControlCommand::ReportSchedule => info!("Gathering schedule..."),
        ControlCommand::DryRunAll => debug!("Dry-run requested"),
    }

    if commands.send(command).await.is_err() {
        debug!("Control loop gone, signal listener exiting");
        return false;
    }
    command != ControlCommand::Shutdown
}
