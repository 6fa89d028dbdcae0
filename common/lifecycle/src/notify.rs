//! Readiness notification to a supervising service manager.

use std::fmt;
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::NotifyError;

const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    Ready,
    Stopping,
}

impl NotifyEvent {
    /// State line in `sd_notify` wire format.
    pub fn as_state(&self) -> &'static str {
        match self {
            NotifyEvent::Ready => "READY=1",
            NotifyEvent::Stopping => "STOPPING=1",
        }
    }
}

impl fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyEvent::Ready => f.write_str("ready"),
            NotifyEvent::Stopping => f.write_str("stopping"),
        }
    }
}

/// Best-effort channel to the process supervisor.
///
/// `Ok(true)` means the event was handed to the transport, `Ok(false)` means there is no
/// supervisor listening in this environment. Callers must treat both, and any error, as
/// non-fatal.
#[async_trait]
pub trait ReadinessNotifier: Send + Sync {
    async fn notify(&self, event: NotifyEvent) -> Result<bool, NotifyError>;
}

#[async_trait]
impl<N: ReadinessNotifier + ?Sized> ReadinessNotifier for Box<N> {
    async fn notify(&self, event: NotifyEvent) -> Result<bool, NotifyError> {
        (**self).notify(event).await
    }
}

/// systemd notification protocol over the `NOTIFY_SOCKET` datagram socket.
#[derive(Debug, Clone, Default)]
pub struct SdNotifier {
    socket: Option<String>,
}

impl SdNotifier {
    /// Reads `NOTIFY_SOCKET`. Unset or empty means notifications are unsupported.
    pub fn from_env() -> Self {
        Self {
            socket: std::env::var(NOTIFY_SOCKET_ENV)
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn with_socket(socket: impl Into<String>) -> Self {
        Self {
            socket: Some(socket.into()),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.socket.is_some()
    }

    fn socket_addr(socket: &str) -> Result<NotifyAddr, NotifyError> {
        match socket.strip_prefix('@') {
            Some("") => Err(NotifyError::InvalidSocket(socket.to_string())),
            Some(name) => Ok(NotifyAddr::Abstract(name.to_string())),
            None if socket.starts_with('/') => Ok(NotifyAddr::Path(PathBuf::from(socket))),
            None => Err(NotifyError::InvalidSocket(socket.to_string())),
        }
    }
}

/// Where `NOTIFY_SOCKET` points: a filesystem path or, with a leading '@', a Linux
/// abstract socket name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NotifyAddr {
    Path(PathBuf),
    Abstract(String),
}

impl NotifyAddr {
    fn send(&self, payload: &[u8]) -> std::io::Result<()> {
        // A single local datagram; the send does not block in practice.
        let datagram = UnixDatagram::unbound()?;
        match self {
            NotifyAddr::Path(path) => datagram.send_to(payload, path)?,
            NotifyAddr::Abstract(name) => abstract_send(&datagram, name, payload)?,
        };
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn abstract_send(datagram: &UnixDatagram, name: &str, payload: &[u8]) -> std::io::Result<usize> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    datagram.send_to_addr(payload, &addr)
}

#[cfg(not(target_os = "linux"))]
fn abstract_send(_datagram: &UnixDatagram, name: &str, _payload: &[u8]) -> std::io::Result<usize> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("abstract socket '@{name}' requires Linux"),
    ))
}

#[async_trait]
impl ReadinessNotifier for SdNotifier {
    async fn notify(&self, event: NotifyEvent) -> Result<bool, NotifyError> {
        let Some(socket) = self.socket.as_deref() else {
            return Ok(false);
        };
        let addr = Self::socket_addr(socket)?;
        addr.send(event.as_state().as_bytes())
            .map_err(|source| NotifyError::Send {
                path: PathBuf::from(socket),
                source,
            })?;
        Ok(true)
    }
}

/// Notifier for environments without a service manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl ReadinessNotifier for NoopNotifier {
    async fn notify(&self, _event: NotifyEvent) -> Result<bool, NotifyError> {
        Ok(false)
    }
}

/// Send `event` and log the outcome. Never fails; returns whether the event was delivered.
pub async fn notify_best_effort<N>(notifier: &N, event: NotifyEvent) -> bool
where
    N: ReadinessNotifier + ?Sized,
{
    match notifier.notify(event).await {
        Ok(true) => {
            tracing::debug!(event = %event, "sd_notify: delivered");
            true
        }
        Ok(false) => {
            tracing::info!(event = %event, "sd_notify: not supported");
            false
        }
        Err(e) => {
            tracing::warn!(event = %event, error = %e, "sd_notify: failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_sd_notify_wire_format() {
        assert_eq!(NotifyEvent::Ready.as_state(), "READY=1");
        assert_eq!(NotifyEvent::Stopping.as_state(), "STOPPING=1");
    }

    #[test]
    fn at_sign_names_an_abstract_socket() {
        assert_eq!(
            SdNotifier::socket_addr("@systemd/notify").unwrap(),
            NotifyAddr::Abstract("systemd/notify".into())
        );
        assert_eq!(
            SdNotifier::socket_addr("/run/systemd/notify").unwrap(),
            NotifyAddr::Path(PathBuf::from("/run/systemd/notify"))
        );
    }

    #[test]
    fn relative_or_empty_abstract_socket_is_rejected() {
        assert!(matches!(
            SdNotifier::socket_addr("run/notify"),
            Err(NotifyError::InvalidSocket(_))
        ));
        assert!(matches!(
            SdNotifier::socket_addr("@"),
            Err(NotifyError::InvalidSocket(_))
        ));
    }

    #[tokio::test]
    async fn unset_socket_is_unsupported() {
        let notifier = SdNotifier::default();
        assert!(!notifier.is_supported());
        assert!(!notifier.notify(NotifyEvent::Ready).await.unwrap());
    }

    #[tokio::test]
    async fn noop_notifier_is_unsupported() {
        assert!(!NoopNotifier.notify(NotifyEvent::Stopping).await.unwrap());
    }

    #[tokio::test]
    async fn missing_socket_file_is_a_send_error() {
        let notifier = SdNotifier::with_socket("/nonexistent/lock-keeper/notify.sock");
        let result = notifier.notify(NotifyEvent::Ready).await;
        assert!(matches!(result, Err(NotifyError::Send { .. })));
    }

    #[tokio::test]
    async fn best_effort_swallows_errors() {
        let notifier = SdNotifier::with_socket("relative.sock");
        assert!(!notify_best_effort(&notifier, NotifyEvent::Ready).await);
    }
}
