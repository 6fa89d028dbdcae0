//! Process lifecycle plumbing for long-running single-purpose daemons: a one-shot
//! termination-signal future and best-effort readiness notification to the service
//! manager (systemd `sd_notify` protocol, or a no-op where it is unavailable).

mod error;
mod notify;
mod signals;

pub use error::NotifyError;
pub use notify::{notify_best_effort, NoopNotifier, NotifyEvent, ReadinessNotifier, SdNotifier};
pub use signals::{wait_for_shutdown_signal, ShutdownTrigger};
