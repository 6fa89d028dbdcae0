use std::fmt;

use tokio::signal::unix::{signal, SignalKind};

/// Which OS signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Interrupt => f.write_str("SIGINT"),
            ShutdownTrigger::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Resolves once, on the first SIGINT or SIGTERM.
///
/// Handlers are installed when the future is first polled, not when it is created, so
/// the default disposition stays in place until the caller actually starts waiting.
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownTrigger> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let trigger = tokio::select! {
        _ = interrupt.recv() => ShutdownTrigger::Interrupt,
        _ = terminate.recv() => ShutdownTrigger::Terminate,
    };
    tracing::info!(signal = %trigger, "received shutdown signal");
    Ok(trigger)
}
