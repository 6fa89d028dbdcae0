// Runs in its own test binary: delivering a real signal to the process must not race
// with other tests.

use std::time::Duration;

use lifecycle::{wait_for_shutdown_signal, ShutdownTrigger};

#[tokio::test]
async fn sigterm_resolves_the_shutdown_future() {
    let waiter = tokio::spawn(wait_for_shutdown_signal());

    // Let the spawned future install its handlers before signalling.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = std::process::Command::new("kill")
        .arg("-TERM")
        .arg(std::process::id().to_string())
        .status()
        .expect("failed to run kill");
    assert!(status.success());

    let trigger = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("shutdown future did not resolve")
        .expect("waiter task panicked")
        .expect("failed to install signal handlers");
    assert_eq!(trigger, ShutdownTrigger::Terminate);
}
