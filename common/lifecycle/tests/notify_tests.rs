use std::time::Duration;

use lifecycle::{notify_best_effort, NotifyEvent, ReadinessNotifier, SdNotifier};
use tokio::net::UnixDatagram;

async fn recv_state(listener: &UnixDatagram) -> String {
    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(Duration::from_secs(5), listener.recv(&mut buf))
        .await
        .expect("timed out waiting for notification")
        .expect("recv failed");
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

#[tokio::test]
async fn delivers_ready_then_stopping_to_socket() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notify.sock");
    let listener = UnixDatagram::bind(&path).unwrap();

    let notifier = SdNotifier::with_socket(path.to_str().unwrap());
    assert!(notifier.is_supported());

    assert!(notifier.notify(NotifyEvent::Ready).await.unwrap());
    assert_eq!(recv_state(&listener).await, "READY=1");

    assert!(notify_best_effort(&notifier, NotifyEvent::Stopping).await);
    assert_eq!(recv_state(&listener).await, "STOPPING=1");
}

#[tokio::test]
async fn boxed_notifier_forwards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boxed.sock");
    let listener = UnixDatagram::bind(&path).unwrap();

    let notifier: Box<dyn ReadinessNotifier> =
        Box::new(SdNotifier::with_socket(path.to_str().unwrap()));
    assert!(notifier.notify(NotifyEvent::Ready).await.unwrap());
    assert_eq!(recv_state(&listener).await, "READY=1");
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn abstract_socket_name_is_supported() {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::{SocketAddr, UnixDatagram as StdDatagram};

    let name = format!("lock-keeper-test-{}", std::process::id());
    let addr = SocketAddr::from_abstract_name(name.as_bytes()).unwrap();
    let listener = StdDatagram::bind_addr(&addr).unwrap();
    listener.set_nonblocking(true).unwrap();
    let listener = UnixDatagram::from_std(listener).unwrap();

    let notifier = SdNotifier::with_socket(format!("@{name}"));
    assert!(notifier.notify(NotifyEvent::Ready).await.unwrap());
    assert_eq!(recv_state(&listener).await, "READY=1");
}
